// tests/config_validation.rs

use std::io::Write;
use std::time::Duration;

use data_manager::config::{load_and_validate, BENIGN_IDX_TOKEN_ERROR};
use data_manager::errors::DataManagerError;
use data_manager::types::SubtaskKind;
use tempfile::NamedTempFile;

fn load(contents: &str) -> Result<data_manager::config::ConfigFile, DataManagerError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    load_and_validate(file.path())
}

fn expect_config_error(contents: &str, needle: &str) {
    match load(contents) {
        Err(DataManagerError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} does not mention {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn minimal_config_gets_defaults() {
    let cfg = load(
        r#"
[job]
subtasks = ["cassandra"]

[paths]
work_dir = "/work"

[cql]
keyspaces = ["ks"]

[maintenance]
enabled = false
"#,
    )
    .unwrap();

    assert_eq!(cfg.subtasks, vec![SubtaskKind::Cassandra]);
    assert_eq!(cfg.backup_type, "manual");
    assert_eq!(cfg.wait_timeout, Duration::from_secs(300));
    assert_eq!(cfg.interval, Duration::from_secs(5));
    assert!(cfg.maintenance.is_none());
    assert!(!cfg.job_uuid.is_empty());

    let cql = cfg.cql.unwrap();
    assert_eq!(cql.command, "cqlsh");
    assert_eq!(cql.recoverable_exit_code, 2);
    assert_eq!(cql.benign_errors, vec![BENIGN_IDX_TOKEN_ERROR.to_string()]);
    assert!(cql.drop_keyspaces && cql.truncate_tables);
}

#[test]
fn enabled_maintenance_resolves_every_reference() {
    let cfg = load(
        r#"
[job]
subtasks = ["keycloak"]

[paths]
work_dir = "/work"
status_file = "/shared/kc/status"

[maintenance]
namespace = "prod"
ingress_name = "web"
ingress_class = "maintenance"
config_map_name = "app-config"
config_map_key = "MODE"
config_map_value = "maintenance"
settle_delay = "2s"
"#,
    )
    .unwrap();

    let m = cfg.maintenance.unwrap();
    assert_eq!(m.ingress_name, "web");
    assert_eq!(m.settle_delay, Duration::from_secs(2));
}

#[test]
fn enabled_maintenance_without_references_is_rejected() {
    expect_config_error(
        r#"
[job]
subtasks = ["keycloak"]

[paths]
work_dir = "/work"
status_file = "/shared/kc/status"
"#,
        "[maintenance].namespace",
    );
}

#[test]
fn selected_subtask_needs_its_section() {
    expect_config_error(
        r#"
[job]
subtasks = ["s3"]

[paths]
work_dir = "/work"

[maintenance]
enabled = false
"#,
        "[s3] section is missing",
    );
}

#[test]
fn all_cannot_be_combined() {
    expect_config_error(
        r#"
[job]
subtasks = ["all", "s3"]

[paths]
work_dir = "/work"

[maintenance]
enabled = false
"#,
        "'all'",
    );
}

#[test]
fn keycloak_needs_status_file() {
    expect_config_error(
        r#"
[job]
subtasks = ["keycloak"]

[paths]
work_dir = "/work"

[maintenance]
enabled = false
"#,
        "status_file",
    );
}

#[test]
fn zero_interval_is_rejected() {
    expect_config_error(
        r#"
[job]
subtasks = ["cassandra"]

[paths]
work_dir = "/work"

[cql]
tables = ["ks.t"]

[maintenance]
enabled = false

[readiness]
interval = "0s"
"#,
        "interval",
    );
}

#[test]
fn unknown_subtask_is_a_parse_error() {
    let result = load(
        r#"
[job]
subtasks = ["postgres"]

[paths]
work_dir = "/work"
"#,
    );
    assert!(matches!(result, Err(DataManagerError::TomlError(_))));
}
