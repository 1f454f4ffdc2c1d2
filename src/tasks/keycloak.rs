// src/tasks/keycloak.rs

//! Identity-provider subtasks. The export/import itself runs in the peer
//! container; these subtasks wait on its status marker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::errors::{DataManagerError, Result};
use crate::fs::FileSystem;
use crate::report::Report;
use crate::services::IdentityAdmin;
use crate::tasks::subtask::{BackupSubtask, RestoreSubtask};
use crate::tasks::workdir::{dir_in_workdir, OnMissing};
use crate::types::{ArchiveItem, BoxFuture, StatusMarker};

/// Delay between two reads of the status marker.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll `path` until it reads `DONE`. `ERROR` fails at once.
pub async fn wait_for_done(fs: &dyn FileSystem, path: &Path, interval: Duration, report: &Report) -> Result<()> {
    let report = report.sub_report("wait_status", "in function");
    let mut previous: Option<String> = None;
    loop {
        let status = fs.read_status(path)?.ok_or_else(|| {
            DataManagerError::NotFound(format!("Status file {} is missing", path.display()))
        })?;
        match StatusMarker::parse(&status) {
            Some(StatusMarker::Done) => break,
            Some(StatusMarker::Error) => {
                report.fatal("Status file is ERROR");
                return Err(DataManagerError::IntegrityError(
                    "Status file is ERROR : see keycloak container logs".to_string(),
                ));
            }
            _ => {}
        }
        if previous.as_deref() == Some(status.as_str()) {
            report.debug(format!("Status is still '{status}'"));
        } else {
            report.notify(format!("New status '{status}'"));
            previous = Some(status);
        }
        tokio::time::sleep(interval).await;
    }
    report.notify("Done");
    Ok(())
}

pub struct BackupKeycloak {
    work_dir: PathBuf,
    admin: Arc<dyn IdentityAdmin>,
    fs: Arc<dyn FileSystem>,
    status_file: PathBuf,
    poll_interval: Duration,
}

impl BackupKeycloak {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        admin: Arc<dyn IdentityAdmin>,
        fs: Arc<dyn FileSystem>,
        status_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            admin,
            fs,
            status_file: status_file.into(),
            poll_interval: STATUS_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl BackupSubtask for BackupKeycloak {
    fn name(&self) -> &'static str {
        "kc"
    }

    fn metadata<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<(String, Value)>> {
        Box::pin(async move {
            let report = report.sub_report("BackupKeycloak", "Metadata");
            let server_info = self.admin.system_info(&report).await?;
            Ok((self.name().to_string(), json!({ "server_info": server_info })))
        })
    }

    fn prepare<'a>(&'a mut self, _report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report_notify("BackupKeycloak", "Running");
            wait_for_done(self.fs.as_ref(), &self.status_file, self.poll_interval, &report).await
        })
    }

    fn locate(&self) -> Result<(PathBuf, ArchiveItem)> {
        let dir = dir_in_workdir(&self.work_dir, ArchiveItem::Keycloak.as_str(), OnMissing::Create)?;
        Ok((dir, ArchiveItem::Keycloak))
    }
}

pub struct RestoreKeycloak {
    fs: Arc<dyn FileSystem>,
    status_file: PathBuf,
    poll_interval: Duration,
}

impl RestoreKeycloak {
    pub fn new(fs: Arc<dyn FileSystem>, status_file: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            status_file: status_file.into(),
            poll_interval: STATUS_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl RestoreSubtask for RestoreKeycloak {
    fn name(&self) -> &'static str {
        "kc"
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report_notify("RestoreKeycloak", "Running");
            wait_for_done(self.fs.as_ref(), &self.status_file, self.poll_interval, &report).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test(start_paused = true)]
    async fn waits_until_done() {
        let fs = MockFileSystem::new();
        fs.add_file("/kc/status", "EXPORTING\n");
        let report = Report::root("test");

        let writer = fs.clone();
        let flip = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            writer.add_file("/kc/status", "DONE\n");
        });

        let started = tokio::time::Instant::now();
        wait_for_done(&fs, Path::new("/kc/status"), STATUS_POLL_INTERVAL, &report)
            .await
            .unwrap();
        flip.await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn error_marker_fails_immediately() {
        let fs = MockFileSystem::new();
        fs.add_file("/kc/status", "ERROR");
        let report = Report::root("test");

        let result = wait_for_done(&fs, Path::new("/kc/status"), STATUS_POLL_INTERVAL, &report).await;
        assert!(matches!(result, Err(DataManagerError::IntegrityError(_))));
    }
}
