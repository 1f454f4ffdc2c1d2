// src/archive/mod.rs

//! Archive container: gzip-compressed tar with named top-level items and a
//! `metadata.json` entry.

pub mod creator;
pub mod extractor;

pub use creator::{ArchiveCreator, ARCHIVE_FORMAT_VERSION};
pub use extractor::ArchiveExtractor;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use crate::types::ArchiveItem;
    use std::fs;

    #[test]
    fn extracts_only_the_requested_item() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let report = Report::root("test");

        fs::create_dir_all(src.path().join("minio/bucket")).unwrap();
        fs::write(src.path().join("minio/bucket/obj"), b"object").unwrap();
        fs::create_dir_all(src.path().join("cql/schema")).unwrap();
        fs::write(src.path().join("cql/schema/k.cql"), b"CREATE KEYSPACE k;").unwrap();

        let mut creator = ArchiveCreator::new(&report, src.path(), "job");
        creator.add_dir_item(src.path().join("minio"), ArchiveItem::Minio);
        creator.add_dir_item(src.path().join("cql"), ArchiveItem::Cql);
        let archive = creator.finalize().unwrap();

        let extractor = ArchiveExtractor::new(&report, &archive, dst.path());
        assert!(extractor.extract_dir_item("cql").unwrap() > 0);

        assert_eq!(fs::read(dst.path().join("cql/schema/k.cql")).unwrap(), b"CREATE KEYSPACE k;");
        assert!(!dst.path().join("minio").exists());
    }

    #[test]
    fn metadata_starts_with_identity_fields() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::root("test");

        let mut creator = ArchiveCreator::new(&report, dir.path(), "job-1");
        let archive_uuid = creator.archive_uuid().to_string();
        creator.add_metadata("cql", serde_json::json!({"host": "h"})).unwrap();
        let metadata_path = creator.metadata_path();
        let archive = creator.finalize().unwrap();

        assert_eq!(
            archive.file_name().unwrap().to_string_lossy(),
            format!("job-1_{archive_uuid}.tgz")
        );
        assert!(metadata_path.is_file());

        let metadata = ArchiveExtractor::new(&report, &archive, dir.path()).metadata().unwrap();
        assert_eq!(metadata["version"], ARCHIVE_FORMAT_VERSION);
        assert_eq!(metadata["job"], "job-1");
        assert_eq!(metadata["archive"], archive_uuid.as_str());
        assert_eq!(metadata["cql"]["host"], "h");
    }

    #[test]
    fn missing_item_path_fails_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::root("test");

        let mut creator = ArchiveCreator::new(&report, dir.path(), "job");
        creator.add_dir_item(dir.path().join("kc"), ArchiveItem::Keycloak);

        assert!(matches!(creator.finalize(), Err(crate::errors::DataManagerError::ArchiveError(_))));
    }
}
