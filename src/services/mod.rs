// src/services/mod.rs

//! Collaborator services used by the tasks. Each is a trait so tests can
//! substitute in-memory versions.

pub mod cluster;
pub mod drive;
pub mod identity;

pub use cluster::{ClusterControl, ConfigValueRef, IngressRef, KubectlClusterControl};
pub use drive::{ArchiveInfo, ArchiveStore, DirectoryArchiveStore};
pub use identity::{HttpIdentityAdmin, IdentityAdmin};
