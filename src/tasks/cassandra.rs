// src/tasks/cassandra.rs

//! Database subtasks: keyspace schemas and table data as CSV.
//!
//! Layout: `<work_dir>/cql/schema/<keyspace>.cql` and
//! `<work_dir>/cql/data/<table>.csv`.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::Result;
use crate::report::Report;
use crate::tasks::subtask::{BackupSubtask, RestoreSubtask};
use crate::tasks::workdir::{dir_in_workdir, OnMissing};
use crate::tools::CqlshCommands;
use crate::types::{ArchiveItem, BoxFuture};

const SCHEMA_DIR: &str = "cql/schema";
const DATA_DIR: &str = "cql/data";

/// Keyspaces and tables handled by a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CqlSelection {
    pub keyspaces: Vec<String>,
    pub tables: Vec<String>,
}

pub struct BackupCassandra {
    work_dir: PathBuf,
    cqlsh: Arc<CqlshCommands>,
    selection: CqlSelection,
}

impl BackupCassandra {
    pub fn new(work_dir: impl Into<PathBuf>, cqlsh: Arc<CqlshCommands>, selection: CqlSelection) -> Self {
        Self {
            work_dir: work_dir.into(),
            cqlsh,
            selection,
        }
    }
}

impl BackupSubtask for BackupCassandra {
    fn name(&self) -> &'static str {
        "cql"
    }

    fn metadata<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<(String, Value)>> {
        Box::pin(async move {
            let report = report.sub_report("BackupCassandra", "Metadata");
            let host = self.cqlsh.show_host(&report).await?;
            let versions = self.cqlsh.show_version(&report).await?;
            Ok((
                self.name().to_string(),
                json!({ "host": host, "versions": versions }),
            ))
        })
    }

    fn prepare<'a>(&'a mut self, _report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut report = report.sub_report_notify("BackupCassandra", "Running");

            report.debug(format!("keyspaces={:?}", self.selection.keyspaces));
            if !self.selection.keyspaces.is_empty() {
                let schema_dir = dir_in_workdir(&self.work_dir, SCHEMA_DIR, OnMissing::Create)?;
                for keyspace in &self.selection.keyspaces {
                    self.cqlsh
                        .backup_ddl(&report, keyspace, &schema_dir.join(format!("{keyspace}.cql")))
                        .await?;
                }
            }

            report.debug(format!("tables={:?}", self.selection.tables));
            if !self.selection.tables.is_empty() {
                let data_dir = dir_in_workdir(&self.work_dir, DATA_DIR, OnMissing::Create)?;
                for table in &self.selection.tables {
                    self.cqlsh
                        .backup_table(&report, table, &data_dir.join(format!("{table}.csv")))
                        .await?;
                }
            }

            report.set_status("Done");
            Ok(())
        })
    }

    fn locate(&self) -> Result<(PathBuf, ArchiveItem)> {
        let dir = dir_in_workdir(&self.work_dir, ArchiveItem::Cql.as_str(), OnMissing::Create)?;
        Ok((dir, ArchiveItem::Cql))
    }
}

pub struct RestoreCassandra {
    work_dir: PathBuf,
    cqlsh: Arc<CqlshCommands>,
    selection: CqlSelection,
    drop_keyspaces: bool,
    truncate_tables: bool,
}

impl RestoreCassandra {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        cqlsh: Arc<CqlshCommands>,
        selection: CqlSelection,
        drop_keyspaces: bool,
        truncate_tables: bool,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            cqlsh,
            selection,
            drop_keyspaces,
            truncate_tables,
        }
    }
}

impl RestoreSubtask for RestoreCassandra {
    fn name(&self) -> &'static str {
        "cql"
    }

    fn run<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut report = report.sub_report_notify("RestoreCassandra", "Running");

            report.debug(format!("keyspaces={:?}", self.selection.keyspaces));
            if !self.selection.keyspaces.is_empty() {
                let schema_dir = dir_in_workdir(&self.work_dir, SCHEMA_DIR, OnMissing::Error)?;
                for keyspace in &self.selection.keyspaces {
                    self.cqlsh
                        .restore_ddl(
                            &report,
                            keyspace,
                            &schema_dir.join(format!("{keyspace}.cql")),
                            self.drop_keyspaces,
                        )
                        .await?;
                }
            }

            report.debug(format!("tables={:?}", self.selection.tables));
            if !self.selection.tables.is_empty() {
                let data_dir = dir_in_workdir(&self.work_dir, DATA_DIR, OnMissing::Error)?;
                for table in &self.selection.tables {
                    self.cqlsh
                        .restore_table(
                            &report,
                            table,
                            &data_dir.join(format!("{table}.csv")),
                            self.truncate_tables,
                        )
                        .await?;
                }
            }

            report.set_status("Done");
            Ok(())
        })
    }
}
