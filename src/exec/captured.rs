// src/exec/captured.rs

//! Classification of request/response tool output.

use crate::exec::process::CapturedOutput;

/// How a captured invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// Recoverable exit code and every stderr line is on the allow-list.
    Tolerated { ignored: Vec<String> },
    Fatal(String),
}

/// Exit code for which stderr is inspected, plus the allow-list of messages
/// that make such a failure harmless.
///
/// A stderr line is benign when it contains one of the allow-list entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePolicy {
    pub recoverable_exit_code: i32,
    pub benign_errors: Vec<String>,
}

impl FailurePolicy {
    pub fn new(recoverable_exit_code: i32, benign_errors: Vec<String>) -> Self {
        Self {
            recoverable_exit_code,
            benign_errors,
        }
    }

    /// Policy with no tolerated failure: any non-zero code is fatal.
    pub fn strict() -> Self {
        Self {
            recoverable_exit_code: 0,
            benign_errors: Vec::new(),
        }
    }

    fn is_benign(&self, line: &str) -> bool {
        self.benign_errors.iter().any(|b| line.contains(b.as_str()))
    }

    pub fn classify(&self, output: &CapturedOutput) -> Verdict {
        if output.success() {
            return Verdict::Success;
        }

        let lines: Vec<&str> = output
            .stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        // A recoverable code with nothing on stderr explains nothing.
        if output.code == self.recoverable_exit_code
            && !lines.is_empty()
            && lines.iter().all(|l| self.is_benign(l))
        {
            return Verdict::Tolerated {
                ignored: lines.into_iter().map(str::to_string).collect(),
            };
        }

        let unexpected: Vec<&str> = lines.into_iter().filter(|l| !self.is_benign(l)).collect();
        Verdict::Fatal(format!(
            "exit code {}: {}",
            output.code,
            if unexpected.is_empty() {
                "<no stderr>".to_string()
            } else {
                unexpected.join(" | ")
            }
        ))
    }
}
