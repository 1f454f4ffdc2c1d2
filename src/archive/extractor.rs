// src/archive/extractor.rs

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde_json::Value;
use tar::Archive;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::types::ArchiveItem;

/// Read side of an archive. Each call scans the whole member list.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    archive_path: PathBuf,
    work_dir: PathBuf,
    report: Report,
}

impl ArchiveExtractor {
    pub fn new(report: &Report, archive_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            work_dir: work_dir.into(),
            report: report.sub_report("ArchiveExtractor", "ComponentInitialized"),
        }
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    fn open(&self) -> Result<Archive<GzDecoder<File>>> {
        let file = File::open(&self.archive_path)?;
        Ok(Archive::new(GzDecoder::new(file)))
    }

    /// Extract members under `<item>/` into the working directory, keeping
    /// their relative paths. Returns the number of members written.
    pub fn extract_dir_item(&self, item: &str) -> Result<usize> {
        let report = self.report.sub_report(format!("extract_{item}"), "in function");
        let prefix = format!("{item}/");

        let mut archive = self.open()?;
        let mut extracted = 0;
        for entry in archive.entries()? {
            let mut entry = entry?;
            let matches = entry.path()?.to_string_lossy().starts_with(&prefix);
            if matches {
                entry.unpack_in(&self.work_dir)?;
                extracted += 1;
            }
        }

        report.debug(format!("{extracted} member(s) extracted"));
        Ok(extracted)
    }

    /// Parsed `metadata.json` entry.
    pub fn metadata(&self) -> Result<Value> {
        let mut archive = self.open()?;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.as_os_str() == ArchiveItem::Metadata.as_str() {
                let mut raw = String::new();
                entry.read_to_string(&mut raw)?;
                return Ok(serde_json::from_str(&raw)?);
            }
        }
        Err(DataManagerError::ArchiveError(format!(
            "{} has no {} entry",
            self.archive_path.display(),
            ArchiveItem::Metadata
        )))
    }
}
