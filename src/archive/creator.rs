// src/archive/creator.rs

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::{Map, Value};
use tar::Builder;
use uuid::Uuid;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::types::ArchiveItem;

/// Version written in the `version` metadata entry.
pub const ARCHIVE_FORMAT_VERSION: &str = "v1";

/// Accumulates items and metadata, then writes one `.tgz`.
///
/// Items keep their insertion order; adding a name twice replaces the path.
/// [`finalize`](Self::finalize) consumes the creator.
#[derive(Debug)]
pub struct ArchiveCreator {
    work_dir: PathBuf,
    job_uuid: String,
    archive_uuid: String,
    items: Vec<(String, PathBuf)>,
    metadata: Map<String, Value>,
    report: Report,
}

impl ArchiveCreator {
    pub fn new(report: &Report, work_dir: impl Into<PathBuf>, job_uuid: impl Into<String>) -> Self {
        let job_uuid = job_uuid.into();
        let archive_uuid = Uuid::new_v4().to_string();
        let report = report.sub_report("ArchiveCreator", "ComponentInitialized");

        let mut metadata = Map::new();
        metadata.insert("version".into(), Value::String(ARCHIVE_FORMAT_VERSION.into()));
        metadata.insert("job".into(), Value::String(job_uuid.clone()));
        metadata.insert("archive".into(), Value::String(archive_uuid.clone()));

        Self {
            work_dir: work_dir.into(),
            job_uuid,
            archive_uuid,
            items: Vec::new(),
            metadata,
            report,
        }
    }

    pub fn archive_uuid(&self) -> &str {
        &self.archive_uuid
    }

    pub fn archive_path(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}.tgz", self.job_uuid, self.archive_uuid))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}_metadata.json", self.job_uuid, self.archive_uuid))
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Add a directory under its archive item name.
    pub fn add_dir_item(&mut self, path: impl Into<PathBuf>, item: ArchiveItem) {
        self.add_named(item.as_str(), path.into());
    }

    /// Add a single file under an arbitrary entry name (e.g. `backup.log`).
    pub fn add_file_item(&mut self, path: impl Into<PathBuf>, name: &str) {
        self.add_named(name, path.into());
    }

    fn add_named(&mut self, name: &str, path: PathBuf) {
        self.report.debug(format!("item {name} <- {}", path.display()));
        match self.items.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = path,
            None => self.items.push((name.to_string(), path)),
        }
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)?;
        self.report.debug(format!("metadata {key}"));
        self.metadata.insert(key, value);
        Ok(())
    }

    /// Write the metadata side file, then the archive with every item plus
    /// `metadata.json`. Returns the archive path.
    pub fn finalize(self) -> Result<PathBuf> {
        let report = self.report.sub_report("finalize", "in function");

        let metadata_path = self.metadata_path();
        let metadata = serde_json::to_vec_pretty(&self.metadata)?;
        std::fs::write(&metadata_path, metadata)?;

        let archive_path = self.archive_path();
        let file = File::create(&archive_path)?;
        let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

        for (name, path) in &self.items {
            report.debug(format!("adding {name}"));
            append_item(&mut builder, name, path)?;
        }
        builder.append_path_with_name(&metadata_path, ArchiveItem::Metadata.as_str())?;

        let encoder = builder.into_inner()?;
        let mut file = encoder.finish()?;
        file.flush()?;

        report.notify(format!("archive written to {}", archive_path.display()));
        Ok(archive_path)
    }
}

fn append_item<W: Write>(builder: &mut Builder<W>, name: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        builder.append_dir_all(name, path)?;
    } else if path.is_file() {
        builder.append_path_with_name(path, name)?;
    } else {
        return Err(DataManagerError::ArchiveError(format!(
            "item {name}: {} is neither a file nor a directory",
            path.display()
        )));
    }
    Ok(())
}
