// src/readiness/probes.rs

use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::{DataManagerError, Result};
use crate::fs::FileSystem;
use crate::readiness::Probe;
use crate::report::Report;
use crate::types::{BoxFuture, StatusMarker};

/// Reads the marker file a sibling container maintains.
///
/// `SETUP` is not ready, `ERROR` fails the wait, anything else is ready. A
/// missing file counts as not ready yet.
pub struct StatusFileProbe {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl StatusFileProbe {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl Probe for StatusFileProbe {
    fn name(&self) -> &str {
        "ProbeKeycloak"
    }

    fn probe<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let Some(status) = self.fs.read_status(&self.path)? else {
                report.notify(format!("status file {} not there yet", self.path.display()));
                return Ok(false);
            };
            report.notify(format!("status file {} content is {status}", self.path.display()));

            match StatusMarker::parse(&status) {
                Some(StatusMarker::Setup) => Ok(false),
                Some(StatusMarker::Error) => Err(DataManagerError::IntegrityError(format!(
                    "status file {} reports {}",
                    self.path.display(),
                    StatusMarker::Error.as_str()
                ))),
                _ => Ok(true),
            }
        })
    }
}

/// GETs a health endpoint; only HTTP 200 is ready. Transport failures are
/// logged and count as not ready.
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthProbe {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Probe for HttpHealthProbe {
    fn name(&self) -> &str {
        "ProbeMinio"
    }

    fn probe<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            match self.client.get(&self.url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    report.notify(format!("GET {} response with status {status}", self.url));
                    Ok(status == reqwest::StatusCode::OK)
                }
                Err(e) => {
                    report.notify(format!("Failed to open URL {} : {e}", self.url));
                    Ok(false)
                }
            }
        })
    }
}
