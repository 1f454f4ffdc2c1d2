// src/tasks/subtask.rs

//! Capability contracts of backup and restore subtasks.

use std::path::PathBuf;

use serde_json::Value;

use crate::errors::Result;
use crate::report::Report;
use crate::types::{ArchiveItem, BoxFuture};

pub trait BackupSubtask: Send + Sync {
    /// Also the key of this subtask's metadata entry.
    fn name(&self) -> &'static str;

    /// Key and value added to the archive metadata.
    fn metadata<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<(String, Value)>>;

    /// Work done before the maintenance window opens.
    fn prepare<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>>;

    /// The backup itself, run inside the maintenance window.
    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>>;

    /// Directory holding this subtask's output and its archive entry name.
    fn locate(&self) -> Result<(PathBuf, ArchiveItem)>;
}

pub trait RestoreSubtask: Send {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>>;
}
