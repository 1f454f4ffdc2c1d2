// src/tasks/mod.rs

//! Job tasks (`backup`, `restore`, `setup`) and the per-component subtasks
//! they sequence.

pub mod backup;
pub mod cassandra;
pub mod keycloak;
pub mod restore;
pub mod s3;
pub mod setup;
pub mod subtask;
pub mod workdir;

pub use backup::{upload_file_name, BackupPhase, BackupTask, LOG_ITEM_NAME};
pub use cassandra::{BackupCassandra, CqlSelection, RestoreCassandra};
pub use keycloak::{wait_for_done, BackupKeycloak, RestoreKeycloak, STATUS_POLL_INTERVAL};
pub use restore::RestoreTask;
pub use s3::{BackupS3, RestoreS3};
pub use setup::{SetupTask, SETUP_ARCHIVE_NAME};
pub use subtask::{BackupSubtask, RestoreSubtask};
pub use workdir::{dir_in_workdir, OnMissing};
