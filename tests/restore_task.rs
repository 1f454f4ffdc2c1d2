// tests/restore_task.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::count_output;
use data_manager::builder::{build_restore, maintenance_details};
use data_manager::errors::DataManagerError;
use data_manager::fs::mock::MockFileSystem;
use data_manager::maintenance::NoopMaintenance;
use data_manager::readiness::ContainersReadiness;
use data_manager::report::Report;
use data_manager::services::ClusterControl;
use data_manager::tasks::{RestoreKeycloak, RestoreTask};
use data_manager::types::SubtaskKind;
use data_manager_test_utils::builders::{cql_section, maintenance_section, ConfigFileBuilder};
use data_manager_test_utils::fake_cluster::InMemoryClusterControl;
use data_manager_test_utils::fake_process::{Reply, ScriptedProcess};
use data_manager_test_utils::fake_store::InMemoryArchiveStore;
use tempfile::TempDir;

const SCHEMA: &str = "CREATE KEYSPACE ks WITH replication = {'class': 'SimpleStrategy', 'replication_factor': '1'};\n\nCREATE TABLE ks.users (id int PRIMARY KEY, name text);\n";

fn config(work: &std::path::Path) -> data_manager::config::ConfigFile {
    ConfigFileBuilder::new(work)
        .subtasks(&[SubtaskKind::Cassandra])
        .with_cql(cql_section(&["ks"], &["ks.users"]))
        .with_maintenance(maintenance_section())
        .build()
}

fn cluster(cfg: &data_manager::config::ConfigFile) -> Arc<InMemoryClusterControl> {
    let details = maintenance_details(cfg.maintenance.as_ref().unwrap());
    Arc::new(
        InMemoryClusterControl::new()
            .with_ingress(&details.ingress, Some("nginx"))
            .with_config_value(&details.config_value_ref, "live"),
    )
}

#[tokio::test]
async fn cassandra_restore_replays_schema_then_data() {
    common::init_tracing();
    let work = TempDir::new().unwrap();
    std::fs::create_dir_all(work.path().join("cql/schema")).unwrap();
    std::fs::create_dir_all(work.path().join("cql/data")).unwrap();
    std::fs::write(work.path().join("cql/schema/ks.cql"), SCHEMA).unwrap();
    std::fs::write(work.path().join("cql/data/ks.users.csv"), "1,alice\n2,bob\n").unwrap();

    let process = Arc::new(ScriptedProcess::new());
    process
        .on("DROP KEYSPACE IF EXISTS ks;", Reply::ok(""))
        .on("DESCRIBE ks;", Reply::ok(format!("Consistency level set to ALL.\n{SCHEMA}")))
        .on("COPY ks.users FROM STDIN", Reply::ok(""))
        .on("SELECT count(*) FROM ks.users", Reply::ok(count_output(2)));

    let cfg = config(work.path());
    let cluster = cluster(&cfg);
    let control: Arc<dyn ClusterControl> = cluster.clone();
    let services = common::services(
        process.clone(),
        Arc::new(InMemoryArchiveStore::new()),
        MockFileSystem::new(),
        Some(control),
    );

    build_restore(&cfg, &services)
        .unwrap()
        .run(&Report::root("restore"))
        .await
        .unwrap();

    let replay = process.position("DROP KEYSPACE IF EXISTS ks;").unwrap();
    let check = process.position("DESCRIBE ks;").unwrap();
    let load = process.position("TRUNCATE ks.users; COPY ks.users FROM STDIN").unwrap();
    assert!(replay < check && check < load);
    assert_eq!(cluster.writes().len(), 4);
    let details = maintenance_details(cfg.maintenance.as_ref().unwrap());
    assert_eq!(cluster.config_value(&details.config_value_ref).as_deref(), Some("live"));
}

#[tokio::test]
async fn missing_setup_output_fails_inside_maintenance() {
    let work = TempDir::new().unwrap();
    let cfg = config(work.path());
    let cluster = cluster(&cfg);
    let control: Arc<dyn ClusterControl> = cluster.clone();
    let process = Arc::new(ScriptedProcess::new());
    let services = common::services(
        process.clone(),
        Arc::new(InMemoryArchiveStore::new()),
        MockFileSystem::new(),
        Some(control),
    );

    let err = build_restore(&cfg, &services)
        .unwrap()
        .run(&Report::root("restore"))
        .await
        .unwrap_err();

    assert!(matches!(err, DataManagerError::NotFound(_)), "got {err:?}");
    assert!(process.calls().is_empty());
    let details = maintenance_details(cfg.maintenance.as_ref().unwrap());
    assert_eq!(cluster.ingress_class(&details.ingress).as_deref(), Some("nginx"));
}

#[tokio::test(start_paused = true)]
async fn keycloak_restore_waits_for_import() {
    let fs = MockFileSystem::new();
    fs.add_file("/shared/kc/status", "IMPORTING\n");
    let writer = fs.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        writer.add_file("/shared/kc/status", "DONE\n");
    });

    let task = RestoreTask::new(
        ContainersReadiness::new(Vec::new(), Duration::from_secs(1), Duration::from_secs(1)),
        vec![Box::new(RestoreKeycloak::new(Arc::new(fs.clone()), "/shared/kc/status"))],
        Box::new(NoopMaintenance::new()),
    );
    assert_eq!(task.subtask_names(), vec!["kc"]);

    let started = tokio::time::Instant::now();
    task.run(&Report::root("restore")).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}
