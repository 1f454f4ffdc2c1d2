#![allow(dead_code)]

use std::path::{Path, PathBuf};

use data_manager::config::{
    ClusterInstanceConfig, ConfigFile, CqlSection, DriveSection, JobSection, LocalInstanceConfig,
    MaintenanceSection, PathsSection, RawConfigFile, ReadinessSection, S3Section,
    BENIGN_IDX_TOKEN_ERROR,
};
use data_manager::types::SubtaskKind;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with maintenance disabled and short readiness timings.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                job: JobSection {
                    uuid: Some("job-0001".to_string()),
                    ..JobSection::default()
                },
                paths: PathsSection {
                    work_dir: work_dir.as_ref().to_path_buf(),
                    log_file: None,
                    status_file: None,
                },
                cql: None,
                s3: None,
                maintenance: MaintenanceSection {
                    enabled: false,
                    ..MaintenanceSection::default()
                },
                readiness: ReadinessSection {
                    wait_timeout: "10s".to_string(),
                    interval: "1s".to_string(),
                },
                drive: DriveSection::default(),
                identity: None,
            },
        }
    }

    pub fn subtasks(mut self, subtasks: &[SubtaskKind]) -> Self {
        self.config.job.subtasks = subtasks.to_vec();
        self
    }

    pub fn backup_type(mut self, backup_type: &str) -> Self {
        self.config.job.backup_type = backup_type.to_string();
        self
    }

    pub fn archive_name(mut self, name: &str) -> Self {
        self.config.job.archive_name = Some(name.to_string());
        self
    }

    pub fn status_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.status_file = Some(path.into());
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.log_file = Some(path.into());
        self
    }

    pub fn with_cql(mut self, cql: CqlSection) -> Self {
        self.config.cql = Some(cql);
        self
    }

    pub fn with_s3(mut self, s3: S3Section) -> Self {
        self.config.s3 = Some(s3);
        self
    }

    pub fn with_maintenance(mut self, maintenance: MaintenanceSection) -> Self {
        self.config.maintenance = maintenance;
        self
    }

    pub fn readiness(mut self, wait_timeout: &str, interval: &str) -> Self {
        self.config.readiness = ReadinessSection {
            wait_timeout: wait_timeout.to_string(),
            interval: interval.to_string(),
        };
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// `[cql]` section with the default command and failure policy.
pub fn cql_section(keyspaces: &[&str], tables: &[&str]) -> CqlSection {
    CqlSection {
        command: "cqlsh".to_string(),
        host: Some("cassandra".to_string()),
        keyspaces: keyspaces.iter().map(|s| s.to_string()).collect(),
        tables: tables.iter().map(|s| s.to_string()).collect(),
        recoverable_exit_code: 2,
        benign_errors: vec![BENIGN_IDX_TOKEN_ERROR.to_string()],
        drop_keyspaces: true,
        truncate_tables: true,
    }
}

/// `[s3]` section against a cluster host `minio.cluster`.
pub fn s3_section(buckets: &[&str]) -> S3Section {
    S3Section {
        mc_binary: PathBuf::from("mc"),
        mc_config_dir: PathBuf::from("/tmp/mc"),
        buckets: buckets.iter().map(|s| s.to_string()).collect(),
        remove_existing_buckets: true,
        local: LocalInstanceConfig {
            access_key: "local-ak".to_string(),
            secret_key: "local-sk".to_string(),
            port: 9000,
        },
        cluster: ClusterInstanceConfig {
            access_key: "cluster-ak".to_string(),
            secret_key: "cluster-sk".to_string(),
            host: "minio.cluster".to_string(),
            port: 9000,
            tls: true,
        },
    }
}

/// Fully populated `[maintenance]` section in namespace `prod`.
pub fn maintenance_section() -> MaintenanceSection {
    MaintenanceSection {
        enabled: true,
        namespace: Some("prod".to_string()),
        ingress_name: Some("web".to_string()),
        ingress_class: Some("maintenance".to_string()),
        config_map_name: Some("app-config".to_string()),
        config_map_key: Some("MODE".to_string()),
        config_map_value: Some("maintenance".to_string()),
        settle_delay: "0s".to_string(),
        ..MaintenanceSection::default()
    }
}
