// src/tasks/workdir.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{DataManagerError, Result};

/// What to do when a working-directory sub-path does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    Create,
    Error,
}

/// `<work_dir>/<relative>`, which must be a directory.
pub fn dir_in_workdir(work_dir: &Path, relative: &str, on_missing: OnMissing) -> Result<PathBuf> {
    let path = work_dir.join(relative);
    if path.exists() {
        if !path.is_dir() {
            return Err(DataManagerError::ConfigError(format!(
                "{} exists but is not a directory",
                path.display()
            )));
        }
        return Ok(path);
    }

    match on_missing {
        OnMissing::Create => {
            fs::create_dir_all(&path)?;
            Ok(path)
        }
        OnMissing::Error => Err(DataManagerError::NotFound(format!(
            "directory {} does not exist",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_error_and_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();

        let created = dir_in_workdir(dir.path(), "cql/schema", OnMissing::Create).unwrap();
        assert!(created.is_dir());
        assert_eq!(dir_in_workdir(dir.path(), "cql/schema", OnMissing::Error).unwrap(), created);

        assert!(matches!(
            dir_in_workdir(dir.path(), "minio", OnMissing::Error),
            Err(DataManagerError::NotFound(_))
        ));

        fs::write(dir.path().join("kc"), b"file").unwrap();
        assert!(matches!(
            dir_in_workdir(dir.path(), "kc", OnMissing::Create),
            Err(DataManagerError::ConfigError(_))
        ));
    }
}
