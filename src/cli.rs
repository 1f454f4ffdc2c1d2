// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `data-manager`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "data-manager",
    version,
    about = "Back up and restore the cluster database, object-store and identity provider.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[command(subcommand)]
    pub task: TaskName,

    /// Path to the config file (TOML).
    ///
    /// Default: `DataManager.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "DataManager.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DATA_MANAGER_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the job plan, but don't touch any service.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// The three job kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Subcommand)]
pub enum TaskName {
    /// Populate the working directory from an archive before a restore.
    Setup,
    /// Produce an archive of the selected components and upload it.
    Backup,
    /// Restore the selected components from the working directory.
    Restore,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Setup => "setup",
            TaskName::Backup => "backup",
            TaskName::Restore => "restore",
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
