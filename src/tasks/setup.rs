// src/tasks/setup.rs

//! Setup task: prime the status marker, then download an archive and
//! extract the items the following restore needs.

use std::path::PathBuf;
use std::sync::Arc;

use crate::archive::ArchiveExtractor;
use crate::errors::{DataManagerError, Result};
use crate::fs::FileSystem;
use crate::report::Report;
use crate::services::ArchiveStore;
use crate::types::{ArchiveItem, StatusMarker};

/// Name of the downloaded archive inside the working directory.
pub const SETUP_ARCHIVE_NAME: &str = "setup_archive.tgz";

pub struct SetupTask {
    work_dir: PathBuf,
    store: Arc<dyn ArchiveStore>,
    fs: Arc<dyn FileSystem>,
    extract_items: Vec<ArchiveItem>,
    status_file: Option<PathBuf>,
    archive_name: Option<String>,
}

impl SetupTask {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        store: Arc<dyn ArchiveStore>,
        fs: Arc<dyn FileSystem>,
        extract_items: Vec<ArchiveItem>,
        status_file: Option<PathBuf>,
        archive_name: Option<String>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            store,
            fs,
            extract_items,
            status_file,
            archive_name,
        }
    }

    /// Returns the id of the archive used, `None` when there was none.
    pub async fn run(self, report: &Report) -> Result<Option<String>> {
        let report = report.sub_report_notify("Setup", "ComponentInitialized");

        if let Some(status_file) = &self.status_file {
            report.debug(format!("Set up status file '{}'", status_file.display()));
            self.fs.write_status(status_file, StatusMarker::Setup.as_str())?;
        }

        let archive_id = match &self.archive_name {
            Some(name) => {
                let id = self.store.get_archive_id(&report, name).await?.ok_or_else(|| {
                    DataManagerError::NotFound(format!("Archive named {name} not found"))
                })?;
                report.notify(format!("using archive : {name} ({id})"));
                id
            }
            None => {
                let archives = self.store.list_archives(&report).await?;
                match archives.into_iter().max_by(|a, b| a.name.cmp(&b.name)) {
                    Some(last) => {
                        report.notify(format!("using last archive : {} ({})", last.name, last.id));
                        last.id
                    }
                    None => {
                        report.warning("No archive found. Skipping setup");
                        return Ok(None);
                    }
                }
            }
        };

        let archive_path = self.work_dir.join(SETUP_ARCHIVE_NAME);
        self.store.download(&report, &archive_id, &archive_path).await?;

        let extractor = ArchiveExtractor::new(&report, &archive_path, &self.work_dir);
        let items = self.extract_items.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            for item in items {
                extractor.extract_dir_item(item.as_str())?;
            }
            Ok(())
        })
        .await
        .map_err(|e| DataManagerError::ArchiveError(format!("extraction task failed: {e}")))??;

        tokio::fs::remove_file(&archive_path).await?;
        report.notify("Done");
        Ok(Some(archive_id))
    }
}
