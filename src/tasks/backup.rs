// src/tasks/backup.rs

//! Backup task: readiness, metadata, prepare, maintenance { run }, archive,
//! upload.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};

use crate::archive::ArchiveCreator;
use crate::errors::{DataManagerError, Result};
use crate::maintenance::{within_maintenance, MaintenanceMode};
use crate::readiness::ContainersReadiness;
use crate::report::Report;
use crate::services::ArchiveStore;
use crate::tasks::subtask::BackupSubtask;

/// Archive entry holding the job log.
pub const LOG_ITEM_NAME: &str = "backup.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    AwaitReadiness,
    CollectMetadata,
    Prepare,
    Maintenance,
    AssembleArchive,
    Upload,
    Done,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackupPhase::AwaitReadiness => "AwaitReadiness",
            BackupPhase::CollectMetadata => "CollectMetadata",
            BackupPhase::Prepare => "Prepare",
            BackupPhase::Maintenance => "Maintenance",
            BackupPhase::AssembleArchive => "AssembleArchive",
            BackupPhase::Upload => "Upload",
            BackupPhase::Done => "Done",
        };
        f.write_str(s)
    }
}

/// `<YYYYmmddHHMMSS>_<job uuid>.tgz`
pub fn upload_file_name<Tz: TimeZone>(now: &DateTime<Tz>, job_uuid: &str) -> String
where
    Tz::Offset: fmt::Display,
{
    format!("{}_{job_uuid}.tgz", now.format("%Y%m%d%H%M%S"))
}

pub struct BackupTask {
    readiness: ContainersReadiness,
    subtasks: Vec<Box<dyn BackupSubtask>>,
    archive: ArchiveCreator,
    store: Arc<dyn ArchiveStore>,
    upload_name: String,
    upload_folder: String,
    maintenance: Box<dyn MaintenanceMode>,
    log_file: Option<PathBuf>,
}

impl BackupTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        readiness: ContainersReadiness,
        subtasks: Vec<Box<dyn BackupSubtask>>,
        archive: ArchiveCreator,
        store: Arc<dyn ArchiveStore>,
        upload_name: impl Into<String>,
        upload_folder: impl Into<String>,
        maintenance: Box<dyn MaintenanceMode>,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            readiness,
            subtasks,
            archive,
            store,
            upload_name: upload_name.into(),
            upload_folder: upload_folder.into(),
            maintenance,
            log_file,
        }
    }

    pub fn subtask_names(&self) -> Vec<&'static str> {
        self.subtasks.iter().map(|s| s.name()).collect()
    }

    /// Run the whole job, returning the id of the uploaded archive.
    pub async fn run(self, report: &Report) -> Result<String> {
        let Self {
            readiness,
            mut subtasks,
            mut archive,
            store,
            upload_name,
            upload_folder,
            mut maintenance,
            log_file,
        } = self;
        let mut report = report.sub_report_notify("Backup", "ComponentInitialized");

        report.set_status(BackupPhase::AwaitReadiness.to_string());
        readiness.wait(&report).await?;

        report.set_status(BackupPhase::CollectMetadata.to_string());
        for subtask in &subtasks {
            let (key, value) = subtask.metadata(&report).await?;
            archive.add_metadata(key, value)?;
        }
        archive.add_metadata("drive", store.describe())?;

        report.set_status(BackupPhase::Prepare.to_string());
        for subtask in subtasks.iter_mut() {
            subtask.prepare(&report).await?;
        }

        report.set_status(BackupPhase::Maintenance.to_string());
        let body_report = report.clone();
        within_maintenance(maintenance.as_mut(), &report, async {
            for subtask in subtasks.iter_mut() {
                subtask.run(&body_report).await?;
            }
            Ok(())
        })
        .await?;

        report.set_status(BackupPhase::AssembleArchive.to_string());
        for subtask in &subtasks {
            let (path, item) = subtask.locate()?;
            archive.add_dir_item(path, item);
        }
        if let Some(log_file) = log_file {
            archive.add_file_item(log_file, LOG_ITEM_NAME);
        }
        let archive_path = tokio::task::spawn_blocking(move || archive.finalize())
            .await
            .map_err(|e| DataManagerError::ArchiveError(format!("archive task failed: {e}")))??;

        report.set_status(BackupPhase::Upload.to_string());
        let id = store
            .upload(&report, &archive_path, &upload_name, &upload_folder)
            .await?;
        report.notify(format!("archive {upload_name} uploaded in {upload_folder} as {id}"));

        report.set_status(BackupPhase::Done.to_string());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn upload_name_uses_compact_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(upload_file_name(&now, "job-1"), "20240309070501_job-1.tgz");
    }
}
