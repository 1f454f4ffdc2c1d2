// src/services/drive.rs

//! Archive storage: where finished archives go and where setup finds them.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tokio::fs;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::types::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub id: String,
    pub name: String,
}

pub trait ArchiveStore: Send + Sync {
    /// Description stored as the `drive` entry of backup metadata.
    fn describe(&self) -> Value;

    fn list_archives<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<Vec<ArchiveInfo>>>;

    /// Store `file` as `name` in `folder`, returning the new archive id.
    fn upload<'a>(&'a self, report: &'a Report, file: &'a Path, name: &'a str, folder: &'a str)
        -> BoxFuture<'a, Result<String>>;

    fn download<'a>(&'a self, report: &'a Report, id: &'a str, file: &'a Path) -> BoxFuture<'a, Result<()>>;

    /// Id of the archive called `name`; more than one match is an error.
    fn get_archive_id<'a>(&'a self, report: &'a Report, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

/// Archives kept as `<root>/<folder>/<name>`, with id `<folder>/<name>`.
#[derive(Debug, Clone)]
pub struct DirectoryArchiveStore {
    root: PathBuf,
    drive_id: Option<String>,
}

impl DirectoryArchiveStore {
    pub fn new(root: impl Into<PathBuf>, drive_id: Option<String>) -> Self {
        Self {
            root: root.into(),
            drive_id,
        }
    }

    fn path_of(&self, id: &str) -> Result<PathBuf> {
        let mut parts = id.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(folder), Some(name))
                if is_plain_component(folder) && is_plain_component(name) =>
            {
                Ok(self.root.join(folder).join(name))
            }
            _ => Err(DataManagerError::NotFound(format!("invalid archive id {id:?}"))),
        }
    }
}

fn is_plain_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains('/')
}

impl ArchiveStore for DirectoryArchiveStore {
    fn describe(&self) -> Value {
        json!({
            "kind": "directory",
            "root": self.root.display().to_string(),
            "drive_id": self.drive_id,
        })
    }

    fn list_archives<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<Vec<ArchiveInfo>>> {
        Box::pin(async move {
            let report = report.sub_report("list_archives", "in function");
            let mut archives = Vec::new();
            if !fs::try_exists(&self.root).await? {
                report.debug(format!("{} does not exist", self.root.display()));
                return Ok(archives);
            }

            let mut folders = fs::read_dir(&self.root).await?;
            while let Some(folder) = folders.next_entry().await? {
                if !folder.file_type().await?.is_dir() {
                    continue;
                }
                let folder_name = folder.file_name().to_string_lossy().into_owned();
                let mut files = fs::read_dir(folder.path()).await?;
                while let Some(file) = files.next_entry().await? {
                    if !file.file_type().await?.is_file() {
                        continue;
                    }
                    let name = file.file_name().to_string_lossy().into_owned();
                    if !name.ends_with(".tgz") {
                        continue;
                    }
                    archives.push(ArchiveInfo {
                        id: format!("{folder_name}/{name}"),
                        name,
                    });
                }
            }
            archives.sort_by(|a, b| a.id.cmp(&b.id));
            report.debug(format!("found {} archive(s)", archives.len()));
            Ok(archives)
        })
    }

    fn upload<'a>(
        &'a self,
        report: &'a Report,
        file: &'a Path,
        name: &'a str,
        folder: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let report = report.sub_report("upload", "in function");
            let id = format!("{folder}/{name}");
            let target = self.path_of(&id)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            let bytes = fs::copy(file, &target).await?;
            report.notify(format!("uploaded {} ({bytes} bytes) as {id}", file.display()));
            Ok(id)
        })
    }

    fn download<'a>(&'a self, report: &'a Report, id: &'a str, file: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report("download", "in function");
            let source = self.path_of(id)?;
            if !fs::try_exists(&source).await? {
                return Err(DataManagerError::NotFound(format!("archive {id}")));
            }
            let bytes = fs::copy(&source, file).await?;
            report.notify(format!("downloaded {id} ({bytes} bytes) to {}", file.display()));
            Ok(())
        })
    }

    fn get_archive_id<'a>(&'a self, report: &'a Report, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let mut matches: Vec<ArchiveInfo> = self
                .list_archives(report)
                .await?
                .into_iter()
                .filter(|a| a.name == name)
                .collect();
            match matches.len() {
                0 => Ok(None),
                1 => Ok(matches.pop().map(|a| a.id)),
                n => Err(DataManagerError::ArchiveError(format!(
                    "{n} archives are named {name}"
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_list_and_download() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = DirectoryArchiveStore::new(root.path(), Some("drive-1".into()));
        let report = Report::root("test");

        let file = scratch.path().join("a.tgz");
        std::fs::write(&file, b"archive bytes").unwrap();

        let id = store.upload(&report, &file, "20240101000000_job.tgz", "cron").await.unwrap();
        assert_eq!(id, "cron/20240101000000_job.tgz");

        let listed = store.list_archives(&report).await.unwrap();
        assert_eq!(
            listed,
            vec![ArchiveInfo {
                id: id.clone(),
                name: "20240101000000_job.tgz".into()
            }]
        );
        assert_eq!(
            store.get_archive_id(&report, "20240101000000_job.tgz").await.unwrap(),
            Some(id.clone())
        );
        assert_eq!(store.get_archive_id(&report, "missing.tgz").await.unwrap(), None);

        let restored = scratch.path().join("restored.tgz");
        store.download(&report, &id, &restored).await.unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), b"archive bytes");
    }

    #[tokio::test]
    async fn same_name_in_two_folders_is_ambiguous() {
        let root = tempfile::tempdir().unwrap();
        for folder in ["cron", "manual"] {
            std::fs::create_dir_all(root.path().join(folder)).unwrap();
            std::fs::write(root.path().join(folder).join("x.tgz"), b"x").unwrap();
        }
        let store = DirectoryArchiveStore::new(root.path(), None);
        let report = Report::root("test");

        assert!(matches!(
            store.get_archive_id(&report, "x.tgz").await,
            Err(DataManagerError::ArchiveError(_))
        ));
    }

    #[tokio::test]
    async fn ids_cannot_escape_the_root() {
        let root = tempfile::tempdir().unwrap();
        let store = DirectoryArchiveStore::new(root.path(), None);
        let report = Report::root("test");
        let out = root.path().join("out.tgz");

        assert!(store.download(&report, "../etc", &out).await.is_err());
        assert!(store.download(&report, "cron/../../x", &out).await.is_err());
    }
}
