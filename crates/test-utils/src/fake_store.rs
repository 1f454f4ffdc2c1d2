use std::path::Path;
use std::sync::Mutex;

use data_manager::errors::{DataManagerError, Result};
use data_manager::report::Report;
use data_manager::services::{ArchiveInfo, ArchiveStore};
use data_manager::types::BoxFuture;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct StoredArchive {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub bytes: Vec<u8>,
}

/// [`ArchiveStore`] keeping uploaded archives in memory.
#[derive(Default)]
pub struct InMemoryArchiveStore {
    archives: Mutex<Vec<StoredArchive>>,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an archive; its id is `<folder>/<name>`.
    pub fn insert(&self, folder: &str, name: &str, bytes: Vec<u8>) -> String {
        let id = format!("{folder}/{name}");
        self.archives.lock().unwrap().push(StoredArchive {
            id: id.clone(),
            name: name.to_string(),
            folder: folder.to_string(),
            bytes,
        });
        id
    }

    pub fn archives(&self) -> Vec<StoredArchive> {
        self.archives.lock().unwrap().clone()
    }
}

impl ArchiveStore for InMemoryArchiveStore {
    fn describe(&self) -> Value {
        json!({ "kind": "memory" })
    }

    fn list_archives<'a>(&'a self, _report: &'a Report) -> BoxFuture<'a, Result<Vec<ArchiveInfo>>> {
        Box::pin(async move {
            Ok(self
                .archives
                .lock()
                .unwrap()
                .iter()
                .map(|a| ArchiveInfo {
                    id: a.id.clone(),
                    name: a.name.clone(),
                })
                .collect())
        })
    }

    fn upload<'a>(
        &'a self,
        _report: &'a Report,
        file: &'a Path,
        name: &'a str,
        folder: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(file).await?;
            Ok(self.insert(folder, name, bytes))
        })
    }

    fn download<'a>(&'a self, _report: &'a Report, id: &'a str, file: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let bytes = self
                .archives
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .map(|a| a.bytes.clone())
                .ok_or_else(|| DataManagerError::NotFound(format!("archive {id}")))?;
            tokio::fs::write(file, bytes).await?;
            Ok(())
        })
    }

    fn get_archive_id<'a>(&'a self, _report: &'a Report, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let archives = self.archives.lock().unwrap();
            let ids: Vec<&str> = archives
                .iter()
                .filter(|a| a.name == name)
                .map(|a| a.id.as_str())
                .collect();
            match ids.as_slice() {
                [] => Ok(None),
                [id] => Ok(Some(id.to_string())),
                _ => Err(DataManagerError::ArchiveError(format!(
                    "more than one archive named {name}"
                ))),
            }
        })
    }
}
