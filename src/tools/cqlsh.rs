// src/tools/cqlsh.rs

//! Database shell (`cqlsh`) statements: schema dumps, CSV copies, counts.
//!
//! Every statement runs with `CONSISTENCY ALL`. That statement prints one
//! acknowledgement line first, which is stripped from dumps.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::errors::{DataManagerError, Result};
use crate::exec::{CapturedOutput, FailurePolicy, Invocation, ProcessBackend, ProgressThrottle, Verdict};
use crate::report::Report;

/// Line of the `SELECT count(*)` output holding the number.
const COUNT_LINE_INDEX: usize = 4;

pub struct CqlshCommands {
    backend: Arc<dyn ProcessBackend>,
    program: PathBuf,
    base_args: Vec<String>,
    host: Option<String>,
    ddl_policy: FailurePolicy,
}

impl CqlshCommands {
    /// `command` is the whole shell command line, split on spaces; `host`
    /// is appended after it when set.
    pub fn new(
        backend: Arc<dyn ProcessBackend>,
        command: &str,
        host: Option<String>,
        ddl_policy: FailurePolicy,
    ) -> Result<Self> {
        let mut parts = command.split(' ').filter(|p| !p.is_empty()).map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| DataManagerError::ConfigError("empty cqlsh command".to_string()))?;
        let mut base_args: Vec<String> = parts.collect();
        if let Some(host) = &host {
            base_args.push(host.clone());
        }
        Ok(Self {
            backend,
            program: PathBuf::from(program),
            base_args,
            host,
            ddl_policy,
        })
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(&self.program).args(self.base_args.iter().cloned())
    }

    /// Request/response statement. Without `stdin` the statement itself is
    /// piped on stdin; with it, the statement goes through `-e`.
    async fn run_statement(&self, report: &Report, cql: &str, stdin: Option<&str>) -> Result<CapturedOutput> {
        let invocation = match stdin {
            None => self.invocation().stdin(cql),
            Some(data) => self.invocation().args(["-e", cql]).stdin(data),
        };
        report.debug(format!("cql='{cql}'"));
        let output = self.backend.capture(&invocation).await?;
        report.debug(format!("return_code={}", output.code));
        Ok(output)
    }

    async fn run_checked(&self, report: &Report, cql: &str, stdin: Option<&str>) -> Result<CapturedOutput> {
        let output = self.run_statement(report, cql, stdin).await?;
        if !output.success() {
            report.fatal(format!("statement failed: {}", output.stderr.trim()));
            return Err(DataManagerError::ToolError(format!(
                "Failure: {}",
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    pub async fn show_host(&self, report: &Report) -> Result<String> {
        let mut report = report.sub_report("show_host", "in function");
        let output = self.run_checked(&report, "SHOW HOST;", None).await?;
        report.set_status(format!("Result: {}", output.stdout.trim()));
        Ok(output.stdout)
    }

    pub async fn show_version(&self, report: &Report) -> Result<String> {
        let mut report = report.sub_report("show_version", "in function");
        let output = self.run_checked(&report, "SHOW VERSION;", None).await?;
        report.set_status(format!("Result: {}", output.stdout.trim()));
        Ok(output.stdout)
    }

    async fn describe(&self, report: &Report, keyspace: &str) -> Result<String> {
        let output = self
            .run_checked(report, &format!("CONSISTENCY ALL; DESCRIBE {keyspace};"), None)
            .await?;
        Ok(strip_banner(&output.stdout))
    }

    /// Dump the schema of `keyspace` into `path_file`.
    pub async fn backup_ddl(&self, report: &Report, keyspace: &str, path_file: &Path) -> Result<()> {
        let mut report = report.sub_report(format!("backup_ddl_{keyspace}"), "in function");
        report.debug(format!("will store ddl in {}", path_file.display()));

        let ddl = self.describe(&report, keyspace).await?;
        fs::write(path_file, ddl).await?;
        report.set_status("Done");
        Ok(())
    }

    /// Replay the schema file of `keyspace`, then check a fresh dump against it.
    pub async fn restore_ddl(
        &self,
        report: &Report,
        keyspace: &str,
        path_file: &Path,
        drop_if_exists: bool,
    ) -> Result<()> {
        let mut report = report.sub_report(format!("restore_ddl_{keyspace}"), "in function");
        report.debug(format!("will take ddl from file {}", path_file.display()));

        let source = fs::read_to_string(path_file).await?;
        let preamble = if drop_if_exists {
            format!("CONSISTENCY ALL;DROP KEYSPACE IF EXISTS {keyspace};")
        } else {
            "CONSISTENCY ALL;".to_string()
        };

        let output = self
            .run_statement(&report, &format!("{preamble}\n{source}"), None)
            .await?;
        match self.ddl_policy.classify(&output) {
            Verdict::Success => report.debug("ok"),
            Verdict::Tolerated { ignored } => {
                report.warning(format!("Ignoring {} benign failure(s)", ignored.len()));
            }
            Verdict::Fatal(msg) => {
                report.fatal(format!("ERROR : {msg}"));
                return Err(DataManagerError::ToolError(format!("Failure: {msg}")));
            }
        }

        report.set_status("CheckKeyspace");
        let dump = self.describe(&report, keyspace).await?;
        let diff = schema_diff(&dump, &source);
        if !diff.is_empty() {
            let msg = format!("keyspace {keyspace} not correctly restored, diff are {diff:?}");
            report.fatal(&msg);
            return Err(DataManagerError::IntegrityError(msg));
        }

        report.set_status("Done");
        Ok(())
    }

    /// Dump `table` as CSV into `path_file`, checking the row count.
    pub async fn backup_table(&self, report: &Report, table: &str, path_file: &Path) -> Result<()> {
        let mut report = report.sub_report(format!("backup_table_{table}"), "in function");
        report.debug(format!("will store table data in {}", path_file.display()));

        let total = self.count_table(&report, table).await?;

        let invocation = self
            .invocation()
            .args(["-e".to_string(), format!("CONSISTENCY ALL; COPY {table} TO STDOUT;")]);

        let mut lines: Vec<String> = Vec::new();
        let mut throttle = ProgressThrottle::default();
        let progress = report.clone();
        let mut sink = |line: &str| -> Result<()> {
            lines.push(line.to_string());
            if throttle.ready() {
                progress.debug(format!("Copied {} / {total} lines", lines.len()));
            }
            Ok(())
        };
        let outcome = self.backend.stream_lines(&invocation, &mut sink).await?;
        if outcome.code != 0 {
            let msg = format!("copy of {table} exited with code {}: {}", outcome.code, outcome.stderr.trim());
            report.fatal(&msg);
            return Err(DataManagerError::ToolError(msg));
        }

        let rows = lines.len().saturating_sub(1) as u64;
        if rows != total {
            let msg = format!("Wrong count of rows : expected {total}, got {rows}");
            report.fatal(&msg);
            return Err(DataManagerError::IntegrityError(msg));
        }

        fs::write(path_file, join_lines(lines.iter().skip(1))).await?;
        report.set_status("Done");
        Ok(())
    }

    /// Load `path_file` into `table`, then check the row count.
    pub async fn restore_table(&self, report: &Report, table: &str, path_file: &Path, truncate: bool) -> Result<()> {
        let mut report = report.sub_report(format!("restore_table_{table}"), "in function");
        report.debug(format!("will take data from file {}", path_file.display()));

        let preamble = if truncate {
            format!("CONSISTENCY ALL; TRUNCATE {table};")
        } else {
            "CONSISTENCY ALL;".to_string()
        };
        let data = fs::read_to_string(path_file).await?;
        let total = data.lines().count() as u64;

        self.run_checked(&report, &format!("{preamble} COPY {table} FROM STDIN;"), Some(data.as_str()))
            .await?;

        let actual = self.count_table(&report, table).await?;
        if total != actual {
            let msg = format!("Expected total row {total}, actual is {actual}");
            report.fatal(&msg);
            return Err(DataManagerError::IntegrityError(msg));
        }

        report.set_status("Done");
        Ok(())
    }

    pub async fn count_table(&self, report: &Report, table: &str) -> Result<u64> {
        let report = report.sub_report("count_table", "in function");
        report.debug(format!("table={table}"));
        let output = self
            .run_checked(&report, &format!("CONSISTENCY ALL;SELECT count(*) FROM {table};"), None)
            .await?;
        parse_count(&output.stdout)
    }
}

/// Drop the first line (the consistency acknowledgement), keeping line
/// endings of the rest.
pub fn strip_banner(out: &str) -> String {
    out.split_inclusive('\n').skip(1).collect()
}

/// Parse the number printed by `SELECT count(*)`.
///
/// ```text
/// Consistency level set to ALL.
///
///  count
/// -------
///    100
///
/// (1 rows)
/// ```
pub fn parse_count(out: &str) -> Result<u64> {
    let line = out.lines().nth(COUNT_LINE_INDEX).ok_or_else(|| {
        DataManagerError::ToolError(format!("unexpected count output: {out:?}"))
    })?;
    line.trim()
        .parse()
        .map_err(|e| DataManagerError::ToolError(format!("invalid count {:?}: {e}", line.trim())))
}

/// Paragraphs of `dump` (blank-line separated) that do not appear in
/// `source`. Surrounding whitespace of a paragraph is ignored.
pub fn schema_diff(dump: &str, source: &str) -> Vec<String> {
    let known: Vec<&str> = source.split("\n\n").map(str::trim).collect();
    dump.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !known.contains(p))
        .map(str::to_string)
        .collect()
}

fn join_lines<'a>(lines: impl Iterator<Item = &'a String>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
