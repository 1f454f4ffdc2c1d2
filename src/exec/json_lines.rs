// src/exec/json_lines.rs

//! Runner for tools that emit one JSON status object per stdout line
//! (the object-store client in `--json` mode).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{DataManagerError, Result};
use crate::exec::process::{Invocation, ProcessBackend};
use crate::report::Report;

/// Value of the `status` field of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Success,
    /// Intermediate progress; handled like success.
    Running,
    Error,
}

/// One parsed stdout line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub status: LineStatus,
    pub doc: Value,
}

impl StatusLine {
    pub fn parse(line: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(line).map_err(|e| {
            DataManagerError::ToolError(format!("invalid JSON line {line:?}: {e}"))
        })?;

        let status = match doc.get("status").and_then(Value::as_str) {
            Some("success") => LineStatus::Success,
            Some("running") => LineStatus::Running,
            Some("error") => LineStatus::Error,
            Some(other) => {
                return Err(DataManagerError::ToolError(format!(
                    "Unknown status in output : {other}"
                )));
            }
            None => {
                return Err(DataManagerError::ToolError(format!(
                    "missing status in output : {line}"
                )));
            }
        };

        Ok(Self { status, doc })
    }

    /// Error payload, preferring its `message` when structured.
    pub fn error_message(&self) -> String {
        match self.doc.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(err) => err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string()),
            None => self.doc.to_string(),
        }
    }
}

/// Drives a JSON-lines tool: fixed leading arguments, per-call arguments,
/// one callback per success record.
#[derive(Clone)]
pub struct JsonLinesRunner {
    backend: Arc<dyn ProcessBackend>,
    program: PathBuf,
    leading_args: Vec<String>,
}

impl JsonLinesRunner {
    pub fn new(backend: Arc<dyn ProcessBackend>, program: impl AsRef<Path>, leading_args: Vec<String>) -> Self {
        Self {
            backend,
            program: program.as_ref().to_path_buf(),
            leading_args,
        }
    }

    fn invocation(&self, args: &[String]) -> Invocation {
        Invocation::new(&self.program)
            .args(self.leading_args.iter().cloned())
            .args(args.iter().cloned())
    }

    /// Run and hand every success or running record to `on_success`.
    ///
    /// The first error record aborts the run. A failing exit code without an
    /// error record is a failure too.
    pub async fn run<F>(&self, report: &Report, args: &[String], on_success: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<()> + Send,
    {
        self.run_invocation(report, self.invocation(args), on_success).await
    }

    /// Same as [`run`](Self::run) for commands whose arguments must stay out
    /// of the logs.
    pub async fn run_sensitive<F>(&self, report: &Report, args: &[String], on_success: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<()> + Send,
    {
        self.run_invocation(report, self.invocation(args).sensitive(), on_success).await
    }

    /// Run ignoring the content of success records.
    pub async fn run_quiet(&self, report: &Report, args: &[String]) -> Result<()> {
        self.run(report, args, |_| Ok(())).await
    }

    async fn run_invocation<F>(&self, report: &Report, invocation: Invocation, mut on_success: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<()> + Send,
    {
        report.debug(format!("run {invocation}"));
        let label = args_label(&invocation);

        let mut sink = |line: &str| -> Result<()> {
            if line.trim().is_empty() {
                return Ok(());
            }
            let record = StatusLine::parse(line)?;
            match record.status {
                LineStatus::Success | LineStatus::Running => on_success(&record.doc),
                LineStatus::Error => {
                    report.fatal(format!("error record: {line}"));
                    Err(DataManagerError::ToolError(format!(
                        "failure when running {label} : {}",
                        record.error_message()
                    )))
                }
            }
        };

        let outcome = self.backend.stream_lines(&invocation, &mut sink).await?;
        if outcome.code != 0 {
            let stderr = outcome.stderr.trim();
            report.fatal(format!("{label} exited with code {}: {stderr}", outcome.code));
            return Err(DataManagerError::ToolError(format!(
                "{label} exited with code {}: {stderr}",
                outcome.code
            )));
        }
        Ok(())
    }
}

/// First per-call arguments, e.g. `mirror` or `admin service stop`.
fn args_label(invocation: &Invocation) -> String {
    let program = invocation
        .program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| invocation.program.display().to_string());
    let verb: Vec<&str> = invocation
        .args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with('-') && !a.contains('/'))
        .take(2)
        .collect();
    if verb.is_empty() {
        program
    } else {
        format!("{program} {}", verb.join(" "))
    }
}
