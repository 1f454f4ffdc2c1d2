// src/tools/mod.rs

//! Wrappers around the data-plane command line tools.

pub mod cqlsh;
pub mod mc;

pub use cqlsh::CqlshCommands;
pub use mc::{DiskUsage, McCommands, S3Credentials, S3Instance};
