// src/builder.rs

//! Wiring: turn a validated [`ConfigFile`] into a runnable task.
//!
//! Every outside collaborator comes in through [`Services`], so tests build
//! the same tasks on top of fakes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::archive::ArchiveCreator;
use crate::cli::TaskName;
use crate::config::{ConfigFile, CqlSection, MaintenanceSettings, S3Section};
use crate::errors::{DataManagerError, Result};
use crate::exec::{FailurePolicy, ProcessBackend, TokioProcessBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::maintenance::{ClusterMaintenance, MaintenanceDetails, MaintenanceMode, NoopMaintenance};
use crate::readiness::{ContainersReadiness, HttpHealthProbe, Probe, StatusFileProbe};
use crate::report::Report;
use crate::services::{
    ArchiveStore, ClusterControl, ConfigValueRef, DirectoryArchiveStore, HttpIdentityAdmin,
    IdentityAdmin, IngressRef, KubectlClusterControl,
};
use crate::tasks::{
    upload_file_name, BackupCassandra, BackupKeycloak, BackupS3, BackupSubtask, BackupTask,
    CqlSelection, RestoreCassandra, RestoreKeycloak, RestoreS3, RestoreSubtask, RestoreTask,
    SetupTask,
};
use crate::tools::{CqlshCommands, McCommands, S3Instance};
use crate::types::SubtaskKind;

/// Outside collaborators of a job.
#[derive(Clone)]
pub struct Services {
    pub process: Arc<dyn ProcessBackend>,
    pub fs: Arc<dyn FileSystem>,
    /// `None` when maintenance redirection is disabled.
    pub cluster: Option<Arc<dyn ClusterControl>>,
    pub store: Arc<dyn ArchiveStore>,
    pub identity: Option<Arc<dyn IdentityAdmin>>,
    pub http: reqwest::Client,
}

impl Services {
    /// Real processes, real filesystem, `kubectl`, a directory drive and the
    /// identity provider's HTTP admin API.
    pub fn production(cfg: &ConfigFile) -> Result<Self> {
        let process: Arc<dyn ProcessBackend> = Arc::new(TokioProcessBackend::new());
        let http = reqwest::Client::builder().build()?;

        let cluster = cfg.maintenance.as_ref().map(|m| {
            Arc::new(KubectlClusterControl::new(
                process.clone(),
                &m.kubectl,
                m.kube_context.clone(),
            )) as Arc<dyn ClusterControl>
        });

        let root = cfg.drive.root.clone().ok_or_else(|| {
            DataManagerError::ConfigError("[drive].root is required".to_string())
        })?;
        let store: Arc<dyn ArchiveStore> =
            Arc::new(DirectoryArchiveStore::new(root, cfg.drive.drive_id.clone()));

        let identity = cfg.identity.as_ref().map(|section| {
            let token = std::env::var(&section.access_token_env).ok();
            Arc::new(HttpIdentityAdmin::new(http.clone(), &section.base_url, token))
                as Arc<dyn IdentityAdmin>
        });

        Ok(Self {
            process,
            fs: Arc::new(RealFileSystem),
            cluster,
            store,
            identity,
            http,
        })
    }
}

/// One task, ready to run.
pub enum Job {
    Setup(SetupTask),
    Backup(BackupTask),
    Restore(RestoreTask),
}

impl Job {
    pub async fn run(self, report: &Report) -> Result<()> {
        match self {
            Job::Setup(task) => task.run(report).await.map(|_| ()),
            Job::Backup(task) => task.run(report).await.map(|_| ()),
            Job::Restore(task) => task.run(report).await,
        }
    }
}

pub fn build_job(task: TaskName, cfg: &ConfigFile, services: &Services, report: &Report) -> Result<Job> {
    Ok(match task {
        TaskName::Setup => Job::Setup(build_setup(cfg, services)),
        TaskName::Backup => Job::Backup(build_backup(cfg, services, report)?),
        TaskName::Restore => Job::Restore(build_restore(cfg, services)?),
    })
}

pub fn build_backup(cfg: &ConfigFile, services: &Services, report: &Report) -> Result<BackupTask> {
    let work_dir = cfg.paths.work_dir.clone();
    let mut subtasks: Vec<Box<dyn BackupSubtask>> = Vec::new();

    for kind in &cfg.subtasks {
        match kind {
            SubtaskKind::S3 => {
                let s3 = s3_section(cfg)?;
                let mc = Arc::new(mc_commands(s3, services));
                subtasks.push(Box::new(BackupS3::new(&work_dir, mc, s3.buckets.clone())));
            }
            SubtaskKind::Cassandra => {
                let cql = cql_section(cfg)?;
                let cqlsh = Arc::new(cqlsh_commands(cql, services)?);
                subtasks.push(Box::new(BackupCassandra::new(&work_dir, cqlsh, selection(cql))));
            }
            SubtaskKind::Keycloak => {
                let admin = services.identity.clone().ok_or_else(|| {
                    DataManagerError::ConfigError(
                        "subtask 'keycloak' backup needs an [identity] section".to_string(),
                    )
                })?;
                subtasks.push(Box::new(BackupKeycloak::new(
                    &work_dir,
                    admin,
                    services.fs.clone(),
                    status_file(cfg)?,
                )));
            }
            SubtaskKind::All => {}
        }
    }

    let archive = ArchiveCreator::new(report, &work_dir, &cfg.job_uuid);
    let upload_name = upload_file_name(&chrono::Local::now(), &cfg.job_uuid);

    Ok(BackupTask::new(
        readiness(cfg, services),
        subtasks,
        archive,
        services.store.clone(),
        upload_name,
        &cfg.backup_type,
        maintenance(cfg, services)?,
        cfg.paths.log_file.clone(),
    ))
}

pub fn build_restore(cfg: &ConfigFile, services: &Services) -> Result<RestoreTask> {
    let work_dir = cfg.paths.work_dir.clone();
    let mut subtasks: Vec<Box<dyn RestoreSubtask>> = Vec::new();

    for kind in &cfg.subtasks {
        match kind {
            SubtaskKind::S3 => {
                let s3 = s3_section(cfg)?;
                let mc = Arc::new(mc_commands(s3, services));
                subtasks.push(Box::new(RestoreS3::new(
                    mc,
                    s3.buckets.clone(),
                    s3.remove_existing_buckets,
                )));
            }
            SubtaskKind::Cassandra => {
                let cql = cql_section(cfg)?;
                let cqlsh = Arc::new(cqlsh_commands(cql, services)?);
                subtasks.push(Box::new(RestoreCassandra::new(
                    &work_dir,
                    cqlsh,
                    selection(cql),
                    cql.drop_keyspaces,
                    cql.truncate_tables,
                )));
            }
            SubtaskKind::Keycloak => {
                subtasks.push(Box::new(RestoreKeycloak::new(
                    services.fs.clone(),
                    status_file(cfg)?,
                )));
            }
            SubtaskKind::All => {}
        }
    }

    Ok(RestoreTask::new(
        readiness(cfg, services),
        subtasks,
        maintenance(cfg, services)?,
    ))
}

pub fn build_setup(cfg: &ConfigFile, services: &Services) -> SetupTask {
    let extract_items = cfg.subtasks.iter().filter_map(|k| k.archive_item()).collect();
    let status_file = if cfg.has_subtask(SubtaskKind::Keycloak) {
        cfg.paths.status_file.clone()
    } else {
        None
    };
    SetupTask::new(
        &cfg.paths.work_dir,
        services.store.clone(),
        services.fs.clone(),
        extract_items,
        status_file,
        cfg.archive_name.clone(),
    )
}

/// One probe per selected component that has a readiness signal.
pub fn readiness(cfg: &ConfigFile, services: &Services) -> ContainersReadiness {
    let mut probes: Vec<Box<dyn Probe>> = Vec::new();
    if let Some(s3) = cfg.s3.as_ref().filter(|_| cfg.has_subtask(SubtaskKind::S3)) {
        let local = local_instance(s3);
        probes.push(Box::new(HttpHealthProbe::new(
            services.http.clone(),
            local.health_live_url(),
        )));
    }
    if cfg.has_subtask(SubtaskKind::Keycloak) {
        if let Some(status_file) = &cfg.paths.status_file {
            probes.push(Box::new(StatusFileProbe::new(services.fs.clone(), status_file)));
        }
    }
    ContainersReadiness::new(probes, cfg.wait_timeout, cfg.interval)
}

fn maintenance(cfg: &ConfigFile, services: &Services) -> Result<Box<dyn MaintenanceMode>> {
    let Some(settings) = &cfg.maintenance else {
        return Ok(Box::new(NoopMaintenance::new()));
    };
    let control = services.cluster.clone().ok_or_else(|| {
        DataManagerError::ConfigError("maintenance enabled but no cluster access".to_string())
    })?;
    Ok(Box::new(
        ClusterMaintenance::new(control, maintenance_details(settings))
            .with_settle_delay(settings.settle_delay),
    ))
}

pub fn maintenance_details(settings: &MaintenanceSettings) -> MaintenanceDetails {
    MaintenanceDetails {
        ingress: IngressRef {
            namespace: settings.namespace.clone(),
            name: settings.ingress_name.clone(),
        },
        ingress_class: settings.ingress_class.clone(),
        config_value_ref: ConfigValueRef {
            namespace: settings.namespace.clone(),
            name: settings.config_map_name.clone(),
            key: settings.config_map_key.clone(),
        },
        config_value: settings.config_map_value.clone(),
    }
}

fn local_instance(s3: &S3Section) -> S3Instance {
    S3Instance::local(&s3.local.access_key, &s3.local.secret_key, s3.local.port)
}

fn mc_commands(s3: &S3Section, services: &Services) -> McCommands {
    let cluster = S3Instance {
        credentials: crate::tools::S3Credentials {
            access_key: s3.cluster.access_key.clone(),
            secret_key: s3.cluster.secret_key.clone(),
        },
        host: s3.cluster.host.clone(),
        tls: s3.cluster.tls,
        port: s3.cluster.port,
    };
    McCommands::new(
        services.process.clone(),
        &s3.mc_binary,
        &s3.mc_config_dir,
        local_instance(s3),
        cluster,
    )
}

fn cqlsh_commands(cql: &CqlSection, services: &Services) -> Result<CqlshCommands> {
    let policy = FailurePolicy::new(cql.recoverable_exit_code, cql.benign_errors.clone());
    CqlshCommands::new(services.process.clone(), &cql.command, cql.host.clone(), policy)
}

fn selection(cql: &CqlSection) -> CqlSelection {
    CqlSelection {
        keyspaces: cql.keyspaces.clone(),
        tables: cql.tables.clone(),
    }
}

fn s3_section(cfg: &ConfigFile) -> Result<&S3Section> {
    cfg.s3
        .as_ref()
        .ok_or_else(|| DataManagerError::ConfigError("[s3] section is missing".to_string()))
}

fn cql_section(cfg: &ConfigFile) -> Result<&CqlSection> {
    cfg.cql
        .as_ref()
        .ok_or_else(|| DataManagerError::ConfigError("[cql] section is missing".to_string()))
}

fn status_file(cfg: &ConfigFile) -> Result<PathBuf> {
    cfg.paths.status_file.clone().ok_or_else(|| {
        DataManagerError::ConfigError("[paths].status_file is not set".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::fs::mock::MockFileSystem;

    fn config(subtasks: &str) -> ConfigFile {
        let raw: RawConfigFile = toml::from_str(&format!(
            r#"
[job]
subtasks = {subtasks}

[paths]
work_dir = "/work"
status_file = "/shared/kc/status"

[s3]
mc_config_dir = "/tmp/mc"
buckets = ["assets"]
local = {{ access_key = "ak", secret_key = "sk", port = 9100 }}
cluster = {{ access_key = "ak", secret_key = "sk", host = "minio.cluster" }}

[maintenance]
enabled = false
"#
        ))
        .unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    fn services() -> Services {
        Services {
            process: Arc::new(TokioProcessBackend::new()),
            fs: Arc::new(MockFileSystem::new()),
            cluster: None,
            store: Arc::new(DirectoryArchiveStore::new("/drive", None)),
            identity: None,
            http: reqwest::Client::new(),
        }
    }

    #[test]
    fn probes_follow_selected_subtasks() {
        let services = services();

        let both = readiness(&config(r#"["s3", "keycloak"]"#), &services);
        assert_eq!(both.probe_names(), vec!["ProbeMinio", "ProbeKeycloak"]);

        let s3_only = readiness(&config(r#"["s3"]"#), &services);
        assert_eq!(s3_only.probe_names(), vec!["ProbeMinio"]);
    }

    #[test]
    fn keycloak_backup_requires_identity_admin() {
        let cfg = config(r#"["keycloak"]"#);
        let result = build_backup(&cfg, &services(), &Report::root("test"));
        assert!(matches!(result, Err(DataManagerError::ConfigError(msg)) if msg.contains("[identity]")));
    }

    #[test]
    fn restore_order_follows_config() {
        let cfg = config(r#"["keycloak", "s3"]"#);
        let task = build_restore(&cfg, &services()).unwrap();
        assert_eq!(task.subtask_names(), vec!["s3", "kc"]);
    }
}
