// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory marker store.
///
/// Clones share the same storage, so a test can keep one handle to flip a
/// status marker while the code under test reads through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files.lock().unwrap().remove(path.as_ref());
    }

    /// Raw bytes as last written, newline included.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn read_status(&self, path: &Path) -> Result<Option<String>> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .map(|raw| {
                std::str::from_utf8(raw)
                    .map(|s| s.trim().to_string())
                    .map_err(|e| anyhow!("status file {:?} is not UTF-8: {}", path, e))
            })
            .transpose()
    }

    fn write_status(&self, path: &Path, status: &str) -> Result<()> {
        self.add_file(path, format!("{status}\n"));
        Ok(())
    }
}
