// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataManagerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An external tool reported a failure (error record, failing exit code).
    #[error("Tool failure: {0}")]
    ToolError(String),

    /// Restored or copied data does not match its source.
    #[error("Integrity failure: {0}")]
    IntegrityError(String),

    #[error("Readiness probing failed after {0} seconds")]
    ReadinessTimeout(u64),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DataManagerError>;
