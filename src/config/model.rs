// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::SubtaskKind;

/// Message cqlsh prints when replaying a materialized view that references the
/// internal `idx_token` column. The view is still created; the error is benign.
///
/// Tied to the wording of one cqlsh version.
pub const BENIGN_IDX_TOKEN_ERROR: &str = "InvalidRequest: Error from server: code=2200 [Invalid query] message=\"Unknown column name detected in CREATE MATERIALIZED VIEW statement: idx_token\"";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [job]
/// backup_type = "cron"
/// subtasks = ["all"]
///
/// [paths]
/// work_dir = "/var/lib/data-manager/work"
/// log_file = "/var/lib/data-manager/work/job.log"
/// status_file = "/shared/kc/status"
///
/// [cql]
/// command = "cqlsh --request-timeout=3600"
/// host = "cassandra"
/// keyspaces = ["assets"]
/// tables = ["assets.entities"]
///
/// [s3]
/// mc_binary = "/usr/local/bin/mc"
/// mc_config_dir = "/tmp/mc"
/// buckets = ["assets"]
/// local = { access_key = "minio", secret_key = "minio123" }
/// cluster = { access_key = "ak", secret_key = "sk", host = "minio.cluster" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub job: JobSection,

    pub paths: PathsSection,

    #[serde(default)]
    pub cql: Option<CqlSection>,

    #[serde(default)]
    pub s3: Option<S3Section>,

    #[serde(default)]
    pub maintenance: MaintenanceSection,

    #[serde(default)]
    pub readiness: ReadinessSection,

    #[serde(default)]
    pub drive: DriveSection,

    #[serde(default)]
    pub identity: Option<IdentitySection>,
}

/// `[job]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSection {
    /// Job identifier; a v4 UUID is generated when absent.
    #[serde(default)]
    pub uuid: Option<String>,

    /// Drive folder receiving the archive (e.g. `"cron"` or `"manual"`).
    #[serde(default = "default_backup_type")]
    pub backup_type: String,

    /// Subtasks to run: `["all"]` or any subset of `s3`, `cassandra`, `keycloak`.
    #[serde(default = "default_subtasks")]
    pub subtasks: Vec<SubtaskKind>,

    /// Archive used by `setup`; the latest one when absent.
    #[serde(default)]
    pub archive_name: Option<String>,
}

fn default_backup_type() -> String {
    "manual".to_string()
}

fn default_subtasks() -> Vec<SubtaskKind> {
    vec![SubtaskKind::All]
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            uuid: None,
            backup_type: default_backup_type(),
            subtasks: default_subtasks(),
            archive_name: None,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Scratch area holding `minio/`, `cql/`, `kc/` and the archive.
    pub work_dir: PathBuf,

    /// Job log file, shipped inside the backup archive.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Status marker shared with the identity-provider container.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
}

/// `[cql]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CqlSection {
    /// cqlsh command line, split on spaces.
    #[serde(default = "default_cqlsh_command")]
    pub command: String,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub keyspaces: Vec<String>,

    #[serde(default)]
    pub tables: Vec<String>,

    /// Exit code for which stderr is checked against `benign_errors`.
    #[serde(default = "default_recoverable_exit_code")]
    pub recoverable_exit_code: i32,

    /// stderr lines that downgrade a recoverable failure to a warning.
    #[serde(default = "default_benign_errors")]
    pub benign_errors: Vec<String>,

    #[serde(default = "default_true")]
    pub drop_keyspaces: bool,

    #[serde(default = "default_true")]
    pub truncate_tables: bool,
}

fn default_cqlsh_command() -> String {
    "cqlsh".to_string()
}

fn default_recoverable_exit_code() -> i32 {
    2
}

fn default_benign_errors() -> Vec<String> {
    vec![BENIGN_IDX_TOKEN_ERROR.to_string()]
}

fn default_true() -> bool {
    true
}

/// `[s3]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Section {
    #[serde(default = "default_mc_binary")]
    pub mc_binary: PathBuf,

    pub mc_config_dir: PathBuf,

    #[serde(default)]
    pub buckets: Vec<String>,

    /// Force-remove cluster buckets before restoring them.
    #[serde(default = "default_true")]
    pub remove_existing_buckets: bool,

    pub local: LocalInstanceConfig,

    pub cluster: ClusterInstanceConfig,
}

fn default_mc_binary() -> PathBuf {
    PathBuf::from("mc")
}

/// Local object-store instance (always `localhost`, no TLS).
#[derive(Debug, Clone, Deserialize)]
pub struct LocalInstanceConfig {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_s3_port")]
    pub port: u16,
}

/// Cluster object-store instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInstanceConfig {
    pub access_key: String,
    pub secret_key: String,
    pub host: String,
    #[serde(default = "default_s3_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
}

fn default_s3_port() -> u16 {
    9000
}

/// `[maintenance]` section.
///
/// When enabled, every reference field is required.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_kubectl")]
    pub kubectl: PathBuf,

    #[serde(default)]
    pub kube_context: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub ingress_name: Option<String>,

    /// Ingress class routing traffic to the maintenance page.
    #[serde(default)]
    pub ingress_class: Option<String>,

    #[serde(default)]
    pub config_map_name: Option<String>,

    #[serde(default)]
    pub config_map_key: Option<String>,

    /// Config value set while in maintenance.
    #[serde(default)]
    pub config_map_value: Option<String>,

    /// Delay after switching, for the routing layer to converge.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,
}

fn default_kubectl() -> PathBuf {
    PathBuf::from("kubectl")
}

fn default_settle_delay() -> String {
    "5s".to_string()
}

impl Default for MaintenanceSection {
    fn default() -> Self {
        Self {
            enabled: true,
            kubectl: default_kubectl(),
            kube_context: None,
            namespace: None,
            ingress_name: None,
            ingress_class: None,
            config_map_name: None,
            config_map_key: None,
            config_map_value: None,
            settle_delay: default_settle_delay(),
        }
    }
}

/// `[readiness]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessSection {
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout: String,

    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_wait_timeout() -> String {
    "300s".to_string()
}

fn default_interval() -> String {
    "5s".to_string()
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            wait_timeout: default_wait_timeout(),
            interval: default_interval(),
        }
    }
}

/// `[drive]` section: where archives are uploaded to / downloaded from.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DriveSection {
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub drive_id: Option<String>,
}

/// `[identity]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySection {
    /// Base URL of the identity provider, e.g. `https://kc.example.org`.
    pub base_url: String,

    /// Environment variable holding a bearer token for the admin API.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
}

fn default_access_token_env() -> String {
    "KEYCLOAK_ACCESS_TOKEN".to_string()
}

/// Maintenance references, all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSettings {
    pub kubectl: PathBuf,
    pub kube_context: Option<String>,
    pub namespace: String,
    pub ingress_name: String,
    pub ingress_class: String,
    pub config_map_name: String,
    pub config_map_key: String,
    pub config_map_value: String,
    pub settle_delay: Duration,
}

/// Validated configuration.
///
/// Built from [`RawConfigFile`] through `TryFrom` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub job_uuid: String,
    pub backup_type: String,
    /// Concrete subtasks in execution order (`all` expanded).
    pub subtasks: Vec<SubtaskKind>,
    pub archive_name: Option<String>,
    pub paths: PathsSection,
    pub cql: Option<CqlSection>,
    pub s3: Option<S3Section>,
    /// `None` when maintenance redirection is disabled.
    pub maintenance: Option<MaintenanceSettings>,
    pub wait_timeout: Duration,
    pub interval: Duration,
    pub drive: DriveSection,
    pub identity: Option<IdentitySection>,
}

impl ConfigFile {
    pub fn has_subtask(&self, kind: SubtaskKind) -> bool {
        self.subtasks.contains(&kind)
    }
}
