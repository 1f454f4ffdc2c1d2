// src/fs/mod.rs

//! Status markers shared with sibling containers.
//!
//! A marker is a one-line text file (`SETUP`, `DONE`, `ERROR`, ...) that the
//! identity-provider container and this job both read and write.

use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    /// Trimmed marker content, `None` when the file does not exist yet.
    fn read_status(&self, path: &Path) -> Result<Option<String>>;

    /// Replace the marker with `status` followed by a newline. Parent
    /// directories are created as needed.
    fn write_status(&self, path: &Path, status: &str) -> Result<()>;
}

/// Markers on the local disk.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_status(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(Some(raw.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading status file {:?}", path)),
        }
    }

    fn write_status(&self, path: &Path, status: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        std::fs::write(path, format!("{status}\n"))
            .with_context(|| format!("writing status file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn real_markers_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kc/status");
        let fs = RealFileSystem;

        assert_eq!(fs.read_status(&path).unwrap(), None);
        fs.write_status(&path, "SETUP").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SETUP\n");
        assert_eq!(fs.read_status(&path).unwrap().as_deref(), Some("SETUP"));
    }
}
