// src/readiness/mod.rs

//! Readiness gating: wait until every sibling container reports ready.

use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::types::BoxFuture;

pub mod probes;

pub use probes::{HttpHealthProbe, StatusFileProbe};

/// A named readiness check.
///
/// `Ok(false)` means "not yet"; an error aborts the wait at once.
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    fn probe<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<bool>>;
}

pub struct ContainersReadiness {
    probes: Vec<Box<dyn Probe>>,
    wait_timeout: Duration,
    interval: Duration,
}

impl ContainersReadiness {
    pub fn new(probes: Vec<Box<dyn Probe>>, wait_timeout: Duration, interval: Duration) -> Self {
        Self {
            probes,
            wait_timeout,
            interval,
        }
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    /// One round: probes run in order and the round stops at the first one
    /// not ready.
    async fn probe_all(&self, report: &Report) -> Result<bool> {
        for probe in &self.probes {
            let report = report.sub_report(probe.name(), "probe");
            let ready = probe.probe(&report).await?;
            report.notify(format!("result: {ready}"));
            if !ready {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Poll until every probe is ready.
    ///
    /// The deadline is fixed when the wait starts and only checked between
    /// rounds, so a timeout fires at most one interval past it.
    pub async fn wait(&self, report: &Report) -> Result<()> {
        let mut report = report.sub_report("ContainersReadiness", "Probing");
        let give_up_at = Instant::now() + self.wait_timeout;

        let mut ready = self.probe_all(&report).await?;
        while !ready {
            tokio::time::sleep(self.interval).await;
            if Instant::now() > give_up_at {
                report.fatal(format!("probes {:?} still not ready", self.probe_names()));
                return Err(DataManagerError::ReadinessTimeout(self.wait_timeout.as_secs()));
            }
            ready = self.probe_all(&report).await?;
        }

        report.set_status("Ready");
        Ok(())
    }
}
