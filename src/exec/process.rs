// src/exec/process.rs

//! Process backend abstraction.
//!
//! Every external tool (`mc`, `cqlsh`, `kubectl`) is driven through a
//! [`ProcessBackend`]. Production code uses [`TokioProcessBackend`]; tests
//! provide a scripted backend that never spawns a process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::errors::{DataManagerError, Result};
use crate::types::BoxFuture;

/// One external command: program, arguments and optional stdin text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    /// Arguments carry credentials; never log them.
    pub sensitive: bool,
}

impl Invocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdin: None,
            sensitive: false,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Program and arguments joined by spaces.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            write!(f, "{} <{} redacted args>", self.program.display(), self.args.len())
        } else {
            f.write_str(&self.command_line())
        }
    }
}

/// Whole-process result of a request/response invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Result of a streamed invocation once stdout is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub code: i32,
    pub stderr: String,
}

/// Per-line callback for streamed stdout. Returning an error stops the
/// stream and kills the process.
pub type LineSink<'a> = dyn FnMut(&str) -> Result<()> + Send + 'a;

/// Trait abstracting how external commands are executed.
pub trait ProcessBackend: Send + Sync {
    /// Run the command, handing each stdout line to `on_line` as it arrives.
    fn stream_lines<'a>(
        &'a self,
        invocation: &'a Invocation,
        on_line: &'a mut LineSink<'_>,
    ) -> BoxFuture<'a, Result<StreamOutcome>>;

    /// Run the command to completion and capture its whole output.
    fn capture<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<CapturedOutput>>;
}

/// Real process backend built on `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessBackend;

impl TokioProcessBackend {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Feed stdin from a separate task so a chatty child can't deadlock us.
fn spawn_stdin_writer(stdin: Option<ChildStdin>, input: Option<String>, label: String) {
    if let (Some(mut stdin), Some(input)) = (stdin, input) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!(command = %label, error = %e, "failed to write process stdin");
            }
            // Dropping `stdin` closes the pipe.
        });
    }
}

impl ProcessBackend for TokioProcessBackend {
    fn stream_lines<'a>(
        &'a self,
        invocation: &'a Invocation,
        on_line: &'a mut LineSink<'_>,
    ) -> BoxFuture<'a, Result<StreamOutcome>> {
        Box::pin(async move {
            debug!(command = %invocation, "starting streamed process");

            let mut child = Self::command(invocation).spawn().map_err(|e| {
                DataManagerError::ToolError(format!("spawning {}: {e}", invocation.program.display()))
            })?;

            spawn_stdin_writer(
                child.stdin.take(),
                invocation.stdin.clone(),
                invocation.to_string(),
            );

            // Always consume stderr so buffers don't fill.
            let stderr_task = child.stderr.take().map(|mut stderr| {
                tokio::spawn(async move {
                    let mut buf = String::new();
                    let _ = stderr.read_to_string(&mut buf).await;
                    buf
                })
            });

            let stdout = child.stdout.take().ok_or_else(|| {
                DataManagerError::ToolError("no stdout piping when running command".to_string())
            })?;
            let mut lines = BufReader::new(stdout).lines();

            while let Some(line) = lines.next_line().await? {
                if let Err(err) = on_line(&line) {
                    if let Err(e) = child.kill().await {
                        warn!(command = %invocation, error = %e, "failed to kill process");
                    }
                    return Err(err);
                }
            }

            let status = child.wait().await?;
            let stderr = match stderr_task {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };

            let code = status.code().unwrap_or(-1);
            debug!(command = %invocation, exit_code = code, "streamed process exited");
            Ok(StreamOutcome { code, stderr })
        })
    }

    fn capture<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<CapturedOutput>> {
        Box::pin(async move {
            debug!(command = %invocation, "starting process");

            let mut child = Self::command(invocation).spawn().map_err(|e| {
                DataManagerError::ToolError(format!("spawning {}: {e}", invocation.program.display()))
            })?;

            spawn_stdin_writer(
                child.stdin.take(),
                invocation.stdin.clone(),
                invocation.to_string(),
            );

            let output = child.wait_with_output().await?;
            let captured = CapturedOutput {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            debug!(command = %invocation, exit_code = captured.code, "process exited");
            Ok(captured)
        })
    }
}
