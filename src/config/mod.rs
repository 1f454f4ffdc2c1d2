// src/config/mod.rs

//! Configuration loading and validation for data-manager.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve it into a [`ConfigFile`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ClusterInstanceConfig, ConfigFile, CqlSection, DriveSection, IdentitySection, JobSection,
    LocalInstanceConfig, MaintenanceSection, MaintenanceSettings, PathsSection, RawConfigFile,
    ReadinessSection, S3Section, BENIGN_IDX_TOKEN_ERROR,
};
