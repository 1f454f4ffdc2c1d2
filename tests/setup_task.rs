// tests/setup_task.rs

mod common;

use std::path::Path;
use std::sync::Arc;

use data_manager::archive::ArchiveCreator;
use data_manager::builder::build_setup;
use data_manager::errors::DataManagerError;
use data_manager::fs::mock::MockFileSystem;
use data_manager::report::Report;
use data_manager::tasks::{SetupTask, SETUP_ARCHIVE_NAME};
use data_manager::types::{ArchiveItem, SubtaskKind};
use data_manager_test_utils::builders::{cql_section, ConfigFileBuilder};
use data_manager_test_utils::fake_process::ScriptedProcess;
use data_manager_test_utils::fake_store::InMemoryArchiveStore;
use tempfile::TempDir;

/// Archive bytes holding `minio/`, `cql/` and `kc/`, each with one file
/// containing `tag`.
fn archive_bytes(tag: &str) -> Vec<u8> {
    let src = TempDir::new().unwrap();
    let report = Report::root("test");
    let mut creator = ArchiveCreator::new(&report, src.path(), "job-0001");
    for item in [ArchiveItem::Minio, ArchiveItem::Cql, ArchiveItem::Keycloak] {
        let dir = src.path().join(item.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tag.txt"), tag).unwrap();
        creator.add_dir_item(&dir, item);
    }
    let path = creator.finalize().unwrap();
    std::fs::read(path).unwrap()
}

fn seeded_store() -> Arc<InMemoryArchiveStore> {
    let store = Arc::new(InMemoryArchiveStore::new());
    store.insert("cron", "20240101000000_job-a.tgz", archive_bytes("old"));
    store.insert("manual", "20240202000000_job-b.tgz", archive_bytes("new"));
    store
}

fn setup(work: &Path, store: Arc<InMemoryArchiveStore>, fs: &MockFileSystem, name: Option<&str>) -> SetupTask {
    SetupTask::new(
        work,
        store,
        Arc::new(fs.clone()),
        vec![ArchiveItem::Minio, ArchiveItem::Cql],
        Some("/shared/kc/status".into()),
        name.map(str::to_string),
    )
}

#[tokio::test]
async fn latest_archive_is_extracted_by_default() {
    common::init_tracing();
    let work = TempDir::new().unwrap();
    let fs = MockFileSystem::new();

    let id = setup(work.path(), seeded_store(), &fs, None)
        .run(&Report::root("setup"))
        .await
        .unwrap();

    assert_eq!(id.as_deref(), Some("manual/20240202000000_job-b.tgz"));
    assert_eq!(std::fs::read_to_string(work.path().join("minio/tag.txt")).unwrap(), "new");
    assert_eq!(std::fs::read_to_string(work.path().join("cql/tag.txt")).unwrap(), "new");
    assert!(!work.path().join("kc").exists());
    assert!(!work.path().join(SETUP_ARCHIVE_NAME).exists());
    assert_eq!(fs.contents("/shared/kc/status"), Some(b"SETUP\n".to_vec()));
}

#[tokio::test]
async fn named_archive_is_used_when_given() {
    let work = TempDir::new().unwrap();
    let fs = MockFileSystem::new();

    setup(work.path(), seeded_store(), &fs, Some("20240101000000_job-a.tgz"))
        .run(&Report::root("setup"))
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(work.path().join("minio/tag.txt")).unwrap(), "old");
}

#[tokio::test]
async fn unknown_archive_name_fails() {
    let work = TempDir::new().unwrap();
    let fs = MockFileSystem::new();

    let err = setup(work.path(), seeded_store(), &fs, Some("missing.tgz"))
        .run(&Report::root("setup"))
        .await
        .unwrap_err();

    match err {
        DataManagerError::NotFound(msg) => assert_eq!(msg, "Archive named missing.tgz not found"),
        e => panic!("Expected NotFound, got: {:?}", e),
    }
}

#[tokio::test]
async fn empty_drive_is_skipped() {
    let work = TempDir::new().unwrap();
    let fs = MockFileSystem::new();

    let id = setup(work.path(), Arc::new(InMemoryArchiveStore::new()), &fs, None)
        .run(&Report::root("setup"))
        .await
        .unwrap();

    assert_eq!(id, None);
    assert_eq!(fs.contents("/shared/kc/status"), Some(b"SETUP\n".to_vec()));
    assert!(std::fs::read_dir(work.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn builder_extracts_selected_items_only() {
    let work = TempDir::new().unwrap();
    let fs = MockFileSystem::new();
    let store = seeded_store();
    let services = common::services(Arc::new(ScriptedProcess::new()), store, fs.clone(), None);
    let cfg = ConfigFileBuilder::new(work.path())
        .subtasks(&[SubtaskKind::Cassandra])
        .with_cql(cql_section(&["ks"], &[]))
        .status_file("/shared/kc/status")
        .build();

    build_setup(&cfg, &services).run(&Report::root("setup")).await.unwrap();

    assert!(work.path().join("cql/tag.txt").exists());
    assert!(!work.path().join("minio").exists());
    // Keycloak not selected: the marker is left alone.
    assert_eq!(fs.contents("/shared/kc/status"), None);
}
