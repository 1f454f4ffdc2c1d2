use std::sync::Mutex;

use data_manager::errors::{DataManagerError, Result};
use data_manager::exec::{CapturedOutput, Invocation, LineSink, ProcessBackend, StreamOutcome};
use data_manager::types::BoxFuture;
use serde_json::Value;

/// What a scripted command "prints".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Reply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// One JSON document per stdout line.
    pub fn json_lines(docs: &[Value]) -> Self {
        let lines: Vec<String> = docs.iter().map(Value::to_string).collect();
        Self::ok(lines.join("\n"))
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command_line: String,
    pub stdin: Option<String>,
}

impl RecordedCall {
    fn haystack(&self) -> String {
        match &self.stdin {
            Some(stdin) => format!("{}\n{}", self.command_line, stdin),
            None => self.command_line.clone(),
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.haystack().contains(pattern)
    }
}

struct Rule {
    pattern: String,
    reply: Reply,
    once: bool,
    used: bool,
}

/// A [`ProcessBackend`] answering from a script instead of spawning.
///
/// Rules are tried in insertion order; a rule matches when its pattern is a
/// substring of the command line or of the stdin text. `once` rules are
/// consumed by their first match. An invocation no rule matches fails with
/// a tool error.
#[derive(Default)]
pub struct ScriptedProcess {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every matching invocation with `reply`.
    pub fn on(&self, pattern: impl Into<String>, reply: Reply) -> &Self {
        self.push(pattern.into(), reply, false);
        self
    }

    /// Answer the next matching invocation only.
    pub fn once(&self, pattern: impl Into<String>, reply: Reply) -> &Self {
        self.push(pattern.into(), reply, true);
        self
    }

    fn push(&self, pattern: String, reply: Reply, once: bool) {
        self.rules.lock().unwrap().push(Rule {
            pattern,
            reply,
            once,
            used: false,
        });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }

    /// Index of the first call matching `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.contains(pattern))
    }

    fn answer(&self, invocation: &Invocation) -> Result<Reply> {
        let call = RecordedCall {
            command_line: invocation.command_line(),
            stdin: invocation.stdin.clone(),
        };
        let haystack = call.haystack();
        self.calls.lock().unwrap().push(call);

        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| !(r.once && r.used) && haystack.contains(r.pattern.as_str()))
            .ok_or_else(|| {
                DataManagerError::ToolError(format!("unscripted invocation: {}", invocation.command_line()))
            })?;
        rule.used = true;
        Ok(rule.reply.clone())
    }
}

impl ProcessBackend for ScriptedProcess {
    fn stream_lines<'a>(
        &'a self,
        invocation: &'a Invocation,
        on_line: &'a mut LineSink<'_>,
    ) -> BoxFuture<'a, Result<StreamOutcome>> {
        Box::pin(async move {
            let reply = self.answer(invocation)?;
            for line in reply.stdout.lines() {
                on_line(line)?;
            }
            Ok(StreamOutcome {
                code: reply.code,
                stderr: reply.stderr,
            })
        })
    }

    fn capture<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, Result<CapturedOutput>> {
        Box::pin(async move {
            let reply = self.answer(invocation)?;
            Ok(CapturedOutput {
                code: reply.code,
                stdout: reply.stdout,
                stderr: reply.stderr,
            })
        })
    }
}
