// src/lib.rs

pub mod archive;
pub mod builder;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod maintenance;
pub mod readiness;
pub mod report;
pub mod services;
pub mod tasks;
pub mod tools;
pub mod types;

use anyhow::Result;
use tracing::debug;

use crate::builder::{build_job, Services};
use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::report::Report;

/// High-level entry point used by `main.rs`.
///
/// The config is loaded by the caller, since the log file it names has to be
/// known before logging starts.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<()> {
    if args.dry_run {
        print_dry_run(&args, &cfg);
        return Ok(());
    }

    let services = Services::production(&cfg)?;
    let report = Report::root(args.task.as_str());
    let job = build_job(args.task, &cfg, &services, &report)?;
    job.run(&report).await?;
    Ok(())
}

/// Print what the task would touch.
fn print_dry_run(args: &CliArgs, cfg: &ConfigFile) {
    println!("data-manager dry-run");
    println!("  task = {}", args.task.as_str());
    println!("  job.uuid = {}", cfg.job_uuid);
    println!("  job.backup_type = {}", cfg.backup_type);
    println!("  paths.work_dir = {}", cfg.paths.work_dir.display());
    if let Some(ref log_file) = cfg.paths.log_file {
        println!("  paths.log_file = {}", log_file.display());
    }
    if let Some(ref name) = cfg.archive_name {
        println!("  job.archive_name = {name}");
    }
    println!(
        "  readiness = timeout {}s, interval {}s",
        cfg.wait_timeout.as_secs(),
        cfg.interval.as_secs()
    );
    match cfg.maintenance {
        Some(ref m) => println!(
            "  maintenance: ingress {}/{} -> {}, configmap {}[{}] -> {}",
            m.namespace, m.ingress_name, m.ingress_class, m.config_map_name, m.config_map_key,
            m.config_map_value
        ),
        None => println!("  maintenance: disabled"),
    }
    println!();

    println!("subtasks ({}):", cfg.subtasks.len());
    for kind in &cfg.subtasks {
        match kind.archive_item() {
            Some(item) => println!("  - {kind:?} (archive item: {item})"),
            None => println!("  - {kind:?}"),
        }
        match kind {
            types::SubtaskKind::S3 => {
                if let Some(ref s3) = cfg.s3 {
                    println!("      buckets: {:?}", s3.buckets);
                    println!("      cluster: {}:{}", s3.cluster.host, s3.cluster.port);
                }
            }
            types::SubtaskKind::Cassandra => {
                if let Some(ref cql) = cfg.cql {
                    println!("      command: {}", cql.command);
                    if !cql.keyspaces.is_empty() {
                        println!("      keyspaces: {:?}", cql.keyspaces);
                    }
                    if !cql.tables.is_empty() {
                        println!("      tables: {:?}", cql.tables);
                    }
                }
            }
            types::SubtaskKind::Keycloak => {
                if let Some(ref status) = cfg.paths.status_file {
                    println!("      status_file: {}", status.display());
                }
            }
            types::SubtaskKind::All => {}
        }
    }

    debug!("dry-run complete (no execution)");
}
