// tests/mirror_verification.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{du, script_mc_plumbing};
use data_manager::errors::DataManagerError;
use data_manager::report::Report;
use data_manager::tools::{McCommands, S3Credentials, S3Instance};
use data_manager_test_utils::fake_process::{Reply, ScriptedProcess};
use serde_json::json;

fn mc(process: &Arc<ScriptedProcess>) -> McCommands {
    let cluster = S3Instance {
        credentials: S3Credentials {
            access_key: "cluster-ak".to_string(),
            secret_key: "cluster-sk".to_string(),
        },
        host: "minio.cluster".to_string(),
        tls: true,
        port: 443,
    };
    McCommands::new(
        process.clone(),
        "mc",
        "/tmp/mc",
        S3Instance::local("local-ak", "local-sk", 9000),
        cluster,
    )
}

fn mirror_progress() -> Reply {
    Reply::json_lines(&[
        json!({ "status": "success", "source": "cluster/assets/a", "target": "local/assets/a", "totalCount": 1 }),
        json!({ "status": "success", "source": "cluster/assets/b", "target": "local/assets/b", "totalCount": 2 }),
    ])
}

#[tokio::test(start_paused = true)]
async fn lagging_target_is_rechecked_once() {
    common::init_tracing();
    let process = Arc::new(ScriptedProcess::new());
    script_mc_plumbing(&process);
    process
        .on("du --versions cluster/assets", Reply::json_lines(&[du(2, 2048)]))
        .once("du --versions local/assets", Reply::json_lines(&[du(1, 1024)]))
        .on("du --versions local/assets", Reply::json_lines(&[du(2, 2048)]))
        .on("mirror --overwrite --preserve --remove cluster/assets local/assets", mirror_progress());

    let started = tokio::time::Instant::now();
    mc(&process)
        .backup_bucket(&Report::root("test"), "assets")
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(process.count_matching("du --versions local/assets"), 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_drift_fails_with_both_usages() {
    let process = Arc::new(ScriptedProcess::new());
    script_mc_plumbing(&process);
    process
        .on("du --versions cluster/assets", Reply::json_lines(&[du(2, 2048)]))
        .on("du --versions local/assets", Reply::json_lines(&[du(1, 1024)]))
        .on("mirror --overwrite", mirror_progress());

    let err = mc(&process)
        .backup_bucket(&Report::root("test"), "assets")
        .await
        .unwrap_err();

    match err {
        DataManagerError::IntegrityError(msg) => assert_eq!(
            msg,
            "Mirror cluster/assets to local/assets failed: expected 2 / 2048 actual 1 / 1024"
        ),
        e => panic!("Expected IntegrityError, got: {:?}", e),
    }
    assert_eq!(process.count_matching("du --versions local/assets"), 2);
}

#[tokio::test]
async fn error_record_aborts_mirror() {
    let process = Arc::new(ScriptedProcess::new());
    script_mc_plumbing(&process);
    process
        .on("du --versions cluster/assets", Reply::json_lines(&[du(2, 2048)]))
        .on(
            "mirror --overwrite",
            Reply::json_lines(&[json!({ "status": "error", "error": { "message": "Access Denied." } })]),
        );

    let err = mc(&process)
        .backup_bucket(&Report::root("test"), "assets")
        .await
        .unwrap_err();

    assert!(
        matches!(&err, DataManagerError::ToolError(msg) if msg == "failure when running mc mirror : Access Denied."),
        "got {err:?}"
    );
    assert_eq!(process.count_matching("du --versions local/assets"), 0);
}

#[tokio::test]
async fn restore_recreates_cluster_bucket_before_mirroring() {
    let process = Arc::new(ScriptedProcess::new());
    script_mc_plumbing(&process);
    process
        .on("du --versions local/assets", Reply::json_lines(&[du(3, 10)]))
        .on("du --versions cluster/assets", Reply::json_lines(&[du(3, 10)]))
        .on("mirror --overwrite", Reply::json_lines(&[]));

    let mc = mc(&process);
    let report = Report::root("test");
    mc.restore_bucket(&report, "assets", true).await.unwrap();
    mc.stop_local(&report).await.unwrap();

    let rb = process.position("rb --force cluster/assets").unwrap();
    let mb = process.position("mb cluster/assets").unwrap();
    let mirror = process
        .position("mirror --overwrite --preserve --remove local/assets cluster/assets")
        .unwrap();
    assert!(rb < mb && mb < mirror);
    assert!(process.position("admin service stop local").unwrap() > mirror);

    assert_eq!(process.count_matching("alias set local http://localhost:9000"), 1);
    assert_eq!(process.count_matching("alias set cluster https://minio.cluster:443"), 1);
}
