use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

/// Boxed, `Send` future used at the trait seams (process backend, subtasks,
/// probes, collaborator services).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Top-level entries of a backup archive.
///
/// Each value maps to exactly one directory (or file) of the working
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiveItem {
    Minio,
    Cql,
    Keycloak,
    Metadata,
}

impl ArchiveItem {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveItem::Minio => "minio",
            ArchiveItem::Cql => "cql",
            ArchiveItem::Keycloak => "kc",
            ArchiveItem::Metadata => "metadata.json",
        }
    }
}

impl fmt::Display for ArchiveItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtasks selectable from `[job].subtasks`.
///
/// `All` is only valid on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskKind {
    All,
    S3,
    Cassandra,
    Keycloak,
}

impl SubtaskKind {
    /// Execution order of the concrete subtasks.
    pub const ORDERED: [SubtaskKind; 3] =
        [SubtaskKind::S3, SubtaskKind::Cassandra, SubtaskKind::Keycloak];

    /// Archive item owned by this subtask (`None` for `All`).
    pub fn archive_item(&self) -> Option<ArchiveItem> {
        match self {
            SubtaskKind::All => None,
            SubtaskKind::S3 => Some(ArchiveItem::Minio),
            SubtaskKind::Cassandra => Some(ArchiveItem::Cql),
            SubtaskKind::Keycloak => Some(ArchiveItem::Keycloak),
        }
    }
}

/// Values written by the identity-provider container into the shared status
/// marker file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMarker {
    /// Container still initialising (written by the setup task).
    Setup,
    Done,
    Error,
}

impl StatusMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusMarker::Setup => "SETUP",
            StatusMarker::Done => "DONE",
            StatusMarker::Error => "ERROR",
        }
    }

    /// Parse a trimmed marker value; unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "SETUP" => Some(StatusMarker::Setup),
            "DONE" => Some(StatusMarker::Done),
            "ERROR" => Some(StatusMarker::Error),
            _ => None,
        }
    }
}
