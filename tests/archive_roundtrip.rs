// tests/archive_roundtrip.rs

use std::collections::BTreeMap;

use data_manager::archive::{ArchiveCreator, ArchiveExtractor};
use data_manager::report::Report;
use data_manager::types::ArchiveItem;
use proptest::prelude::*;
use tempfile::TempDir;

// Files under `cql/`: up to two directory levels, arbitrary bytes.
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let name = "[a-z][a-z0-9_]{0,7}";
    let path = prop_oneof![
        name.prop_map(|f| format!("{f}.csv")),
        (name, name).prop_map(|(d, f)| format!("{d}/{f}.cql")),
    ];
    proptest::collection::btree_map(path, proptest::collection::vec(any::<u8>(), 0..256), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn extracted_item_matches_source(tree in tree_strategy()) {
        let report = Report::root("test");
        let src = TempDir::new().unwrap();
        let cql = src.path().join("cql");
        for (path, bytes) in &tree {
            let full = cql.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, bytes).unwrap();
        }
        std::fs::create_dir_all(src.path().join("minio")).unwrap();
        std::fs::write(src.path().join("minio/other.bin"), b"other").unwrap();

        let mut creator = ArchiveCreator::new(&report, src.path(), "job");
        creator.add_dir_item(&cql, ArchiveItem::Cql);
        creator.add_dir_item(src.path().join("minio"), ArchiveItem::Minio);
        let archive = creator.finalize().unwrap();

        let out = TempDir::new().unwrap();
        let extractor = ArchiveExtractor::new(&report, &archive, out.path());
        let extracted = extractor.extract_dir_item(ArchiveItem::Cql.as_str()).unwrap();
        prop_assert!(extracted >= tree.len());

        for (path, bytes) in &tree {
            let restored = std::fs::read(out.path().join("cql").join(path)).unwrap();
            prop_assert_eq!(&restored, bytes);
        }
        prop_assert!(!out.path().join("minio").exists());

        let metadata = extractor.metadata().unwrap();
        prop_assert_eq!(metadata["job"].as_str(), Some("job"));
    }
}
