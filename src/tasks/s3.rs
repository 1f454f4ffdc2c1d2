// src/tasks/s3.rs

//! Object-store subtasks: mirror cluster buckets through the local store.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::Result;
use crate::report::Report;
use crate::tasks::subtask::{BackupSubtask, RestoreSubtask};
use crate::tasks::workdir::{dir_in_workdir, OnMissing};
use crate::tools::McCommands;
use crate::types::{ArchiveItem, BoxFuture};

pub struct BackupS3 {
    work_dir: PathBuf,
    mc: Arc<McCommands>,
    buckets: Vec<String>,
}

impl BackupS3 {
    pub fn new(work_dir: impl Into<PathBuf>, mc: Arc<McCommands>, buckets: Vec<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            mc,
            buckets,
        }
    }
}

impl BackupSubtask for BackupS3 {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn metadata<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<(String, Value)>> {
        Box::pin(async move {
            let report = report.sub_report("BackupS3", "Metadata");
            let info = self.mc.cluster_info(&report).await?;
            Ok((
                self.name().to_string(),
                json!({ "url": self.mc.cluster_url(), "info": info }),
            ))
        })
    }

    /// `du` every cluster bucket so the cluster has its usage cached.
    fn prepare<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report_notify("BackupS3", "Prepare");
            report.debug(format!("disk usage cluster buckets: {:?}", self.buckets));
            for bucket in &self.buckets {
                let mut bucket_report = report.sub_report_notify(format!("disk_usage_{bucket}"), "Running");
                let usage = self.mc.du_cluster_bucket(&bucket_report, bucket).await?;
                bucket_report.notify(format!("nb_objects: {}, size: {}", usage.objects, usage.size));
                bucket_report.set_status("Done");
            }
            Ok(())
        })
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut report = report.sub_report_notify("BackupS3", "Running");
            report.debug(format!("mirroring buckets: {:?}", self.buckets));
            for bucket in &self.buckets {
                let mut bucket_report = report.sub_report_notify(format!("backup_minio_{bucket}"), "Running");
                self.mc.backup_bucket(&bucket_report, bucket).await?;
                bucket_report.set_status("Done");
            }
            self.mc.stop_local(&report).await?;
            report.set_status("Done");
            Ok(())
        })
    }

    /// The local store owns this directory; it must already exist.
    fn locate(&self) -> Result<(PathBuf, ArchiveItem)> {
        let dir = dir_in_workdir(&self.work_dir, ArchiveItem::Minio.as_str(), OnMissing::Error)?;
        Ok((dir, ArchiveItem::Minio))
    }
}

pub struct RestoreS3 {
    mc: Arc<McCommands>,
    buckets: Vec<String>,
    remove_existing: bool,
}

impl RestoreS3 {
    pub fn new(mc: Arc<McCommands>, buckets: Vec<String>, remove_existing: bool) -> Self {
        Self {
            mc,
            buckets,
            remove_existing,
        }
    }
}

impl RestoreSubtask for RestoreS3 {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut report = report.sub_report_notify("RestoreS3", "Running");
            report.debug(format!("buckets={:?}", self.buckets));
            for bucket in &self.buckets {
                let mut bucket_report = report.sub_report_notify(format!("restore_minio_{bucket}"), "Running");
                self.mc
                    .restore_bucket(&bucket_report, bucket, self.remove_existing)
                    .await?;
                bucket_report.set_status("Done");
            }
            self.mc.stop_local(&report).await?;
            report.set_status("Done");
            Ok(())
        })
    }
}
