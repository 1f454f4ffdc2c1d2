// src/report.rs

//! Hierarchical reporting context.
//!
//! A [`Report`] is an explicit value handed to every operation. It carries the
//! chain of ancestor task names and a current status; every event it emits
//! goes through `tracing` with the chain rendered as `tasks = "a>b>c"`.
//!
//! Children are created with [`Report::sub_report`] and never touch their
//! parent: the chain is shared immutably, the status is per-node.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

/// Level used when a report logs its own status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Debug,
    Notify,
}

#[derive(Debug, Clone)]
pub struct Report {
    tasks: Arc<[String]>,
    status: String,
    status_level: StatusLevel,
}

impl Report {
    /// Root report of a job, named after the task being run.
    pub fn root(task: impl Into<String>) -> Self {
        Self::new(vec![task.into()], "Starting", StatusLevel::Notify)
    }

    fn new(tasks: Vec<String>, init_status: &str, status_level: StatusLevel) -> Self {
        let report = Self {
            tasks: tasks.into(),
            status: init_status.to_string(),
            status_level,
        };
        report.log_status();
        report
    }

    /// Child report whose status changes are logged at debug level.
    pub fn sub_report(&self, task: impl Into<String>, init_status: &str) -> Report {
        self.child(task.into(), init_status, StatusLevel::Debug)
    }

    /// Child report whose status changes are logged at info level.
    pub fn sub_report_notify(&self, task: impl Into<String>, init_status: &str) -> Report {
        self.child(task.into(), init_status, StatusLevel::Notify)
    }

    fn child(&self, task: String, init_status: &str, status_level: StatusLevel) -> Report {
        let mut tasks = Vec::with_capacity(self.tasks.len() + 1);
        tasks.extend(self.tasks.iter().cloned());
        tasks.push(task);
        Self::new(tasks, init_status, status_level)
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    /// Ancestor chain rendered as `a>b>c`.
    pub fn path(&self) -> String {
        self.tasks.join(">")
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.log_status();
    }

    fn log_status(&self) {
        match self.status_level {
            StatusLevel::Notify => info!(tasks = %self.path(), status = %self.status, "status"),
            StatusLevel::Debug => debug!(tasks = %self.path(), status = %self.status, "status"),
        }
    }

    pub fn notify(&self, msg: impl AsRef<str>) {
        info!(tasks = %self.path(), status = %self.status, "{}", msg.as_ref());
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        debug!(tasks = %self.path(), status = %self.status, "{}", msg.as_ref());
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        warn!(tasks = %self.path(), status = %self.status, "{}", msg.as_ref());
    }

    pub fn fatal(&self, msg: impl AsRef<str>) {
        error!(tasks = %self.path(), status = %self.status, "{}", msg.as_ref());
    }
}
