// src/config/validate.rs

use std::time::Duration;

use uuid::Uuid;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, MaintenanceSection, MaintenanceSettings, RawConfigFile,
};
use crate::errors::{DataManagerError, Result};
use crate::types::SubtaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DataManagerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let subtasks = resolve_subtasks(&raw.job.subtasks)?;
        validate_job(&raw)?;
        validate_subtask_sections(&raw, &subtasks)?;
        let maintenance = resolve_maintenance(&raw.maintenance)?;
        let (wait_timeout, interval) = resolve_readiness(&raw)?;

        let job_uuid = raw
            .job
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(ConfigFile {
            job_uuid,
            backup_type: raw.job.backup_type,
            subtasks,
            archive_name: raw.job.archive_name,
            paths: raw.paths,
            cql: raw.cql,
            s3: raw.s3,
            maintenance,
            wait_timeout,
            interval,
            drive: raw.drive,
            identity: raw.identity,
        })
    }
}

/// Expand `all` and order subtasks by execution order.
fn resolve_subtasks(selected: &[SubtaskKind]) -> Result<Vec<SubtaskKind>> {
    if selected.is_empty() {
        return Err(DataManagerError::ConfigError(
            "[job].subtasks must not be empty".to_string(),
        ));
    }

    if selected.contains(&SubtaskKind::All) {
        if selected.len() != 1 {
            return Err(DataManagerError::ConfigError(
                "[job].subtasks contains both 'all' and other elements".to_string(),
            ));
        }
        return Ok(SubtaskKind::ORDERED.to_vec());
    }

    Ok(SubtaskKind::ORDERED
        .iter()
        .copied()
        .filter(|kind| selected.contains(kind))
        .collect())
}

fn validate_job(cfg: &RawConfigFile) -> Result<()> {
    if let Some(uuid) = &cfg.job.uuid {
        if uuid.trim().is_empty() {
            return Err(DataManagerError::ConfigError(
                "[job].uuid set but empty once stripped".to_string(),
            ));
        }
    }

    if cfg.job.backup_type.trim().is_empty() {
        return Err(DataManagerError::ConfigError(
            "[job].backup_type must not be empty".to_string(),
        ));
    }

    if cfg.paths.work_dir.as_os_str().is_empty() {
        return Err(DataManagerError::ConfigError(
            "[paths].work_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_subtask_sections(cfg: &RawConfigFile, subtasks: &[SubtaskKind]) -> Result<()> {
    for kind in subtasks {
        match kind {
            SubtaskKind::S3 => {
                let s3 = cfg.s3.as_ref().ok_or_else(|| {
                    DataManagerError::ConfigError(
                        "subtask 's3' selected but [s3] section is missing".to_string(),
                    )
                })?;
                if s3.buckets.is_empty() {
                    return Err(DataManagerError::ConfigError(
                        "subtask 's3' selected but [s3].buckets is empty".to_string(),
                    ));
                }
            }
            SubtaskKind::Cassandra => {
                let cql = cfg.cql.as_ref().ok_or_else(|| {
                    DataManagerError::ConfigError(
                        "subtask 'cassandra' selected but [cql] section is missing".to_string(),
                    )
                })?;
                if cql.keyspaces.is_empty() && cql.tables.is_empty() {
                    return Err(DataManagerError::ConfigError(
                        "subtask 'cassandra' selected but [cql] has no keyspaces nor tables"
                            .to_string(),
                    ));
                }
                if cql.command.trim().is_empty() {
                    return Err(DataManagerError::ConfigError(
                        "[cql].command must not be empty".to_string(),
                    ));
                }
            }
            SubtaskKind::Keycloak => {
                if cfg.paths.status_file.is_none() {
                    return Err(DataManagerError::ConfigError(
                        "subtask 'keycloak' selected but [paths].status_file is not set"
                            .to_string(),
                    ));
                }
            }
            SubtaskKind::All => {}
        }
    }
    Ok(())
}

fn resolve_maintenance(section: &MaintenanceSection) -> Result<Option<MaintenanceSettings>> {
    if !section.enabled {
        return Ok(None);
    }

    fn required(value: &Option<String>, field: &str) -> Result<String> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v.clone()),
            _ => Err(DataManagerError::ConfigError(format!(
                "[maintenance].{field} is required when maintenance is enabled"
            ))),
        }
    }

    let settle_delay = parse_duration(&section.settle_delay).map_err(|e| {
        DataManagerError::ConfigError(format!("[maintenance].settle_delay: {e}"))
    })?;

    Ok(Some(MaintenanceSettings {
        kubectl: section.kubectl.clone(),
        kube_context: section.kube_context.clone(),
        namespace: required(&section.namespace, "namespace")?,
        ingress_name: required(&section.ingress_name, "ingress_name")?,
        ingress_class: required(&section.ingress_class, "ingress_class")?,
        config_map_name: required(&section.config_map_name, "config_map_name")?,
        config_map_key: required(&section.config_map_key, "config_map_key")?,
        config_map_value: required(&section.config_map_value, "config_map_value")?,
        settle_delay,
    }))
}

fn resolve_readiness(cfg: &RawConfigFile) -> Result<(Duration, Duration)> {
    let wait_timeout = parse_duration(&cfg.readiness.wait_timeout).map_err(|e| {
        DataManagerError::ConfigError(format!("[readiness].wait_timeout: {e}"))
    })?;
    let interval = parse_duration(&cfg.readiness.interval)
        .map_err(|e| DataManagerError::ConfigError(format!("[readiness].interval: {e}")))?;

    if interval.is_zero() {
        return Err(DataManagerError::ConfigError(
            "[readiness].interval must be > 0".to_string(),
        ));
    }

    Ok((wait_timeout, interval))
}
