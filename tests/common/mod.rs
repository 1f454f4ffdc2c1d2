#![allow(dead_code)]

use std::sync::Arc;

use data_manager::builder::Services;
use data_manager::fs::mock::MockFileSystem;
use data_manager::services::ClusterControl;
use data_manager_test_utils::fake_process::{Reply, ScriptedProcess};
use data_manager_test_utils::fake_store::InMemoryArchiveStore;
use serde_json::{json, Value};

pub use data_manager_test_utils::init_tracing;

/// Output of `SELECT count(*)` returning `n`.
pub fn count_output(n: u64) -> String {
    format!("Consistency level set to ALL.\n\n count\n-------\n  {n}\n\n(1 rows)\n")
}

/// `mc du` record.
pub fn du(objects: u64, size: u64) -> Value {
    json!({ "status": "success", "objects": objects, "size": size })
}

pub fn mc_ok() -> Reply {
    Reply::json_lines(&[json!({ "status": "success" })])
}

/// Scripted answers for `mc alias set`, `mb`, `rb` and `admin service stop`.
pub fn script_mc_plumbing(process: &ScriptedProcess) {
    process
        .on("alias set", mc_ok())
        .on(" mb ", mc_ok())
        .on(" rb --force ", mc_ok())
        .on("admin service stop local", mc_ok());
}

pub fn services(
    process: Arc<ScriptedProcess>,
    store: Arc<InMemoryArchiveStore>,
    fs: MockFileSystem,
    cluster: Option<Arc<dyn ClusterControl>>,
) -> Services {
    Services {
        process,
        fs: Arc::new(fs),
        cluster,
        store,
        identity: None,
        http: reqwest::Client::new(),
    }
}
