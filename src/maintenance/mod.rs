// src/maintenance/mod.rs

//! Maintenance window: redirect live traffic while subtasks run.
//!
//! [`within_maintenance`] is the only way tasks use a window. It always calls
//! `exit` once the body finished, whether the body succeeded or failed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::services::{ClusterControl, ConfigValueRef, IngressRef};
use crate::types::BoxFuture;

/// Wait after switching to maintenance, for routing to converge.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// What to switch, and to which values, while in maintenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceDetails {
    pub ingress: IngressRef,
    pub ingress_class: String,
    pub config_value_ref: ConfigValueRef,
    pub config_value: String,
}

/// Two-state machine: Normal and Maintenance.
pub trait MaintenanceMode: Send {
    fn enter<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>>;

    /// Back to Normal. A no-op when not in maintenance.
    fn exit<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>>;

    fn is_active(&self) -> bool;
}

/// Run `body` inside the window.
///
/// When both the body and `exit` fail, the body error is returned and the
/// exit error is logged.
pub async fn within_maintenance<T, F>(window: &mut dyn MaintenanceMode, report: &Report, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let mut report = report.sub_report_notify("Maintenance", "ComponentInitialized");

    report.set_status("MaintenanceModeOn");
    window.enter(&report).await?;

    let outcome = body.await;

    report.set_status("MaintenanceModeOff");
    let exited = window.exit(&report).await;

    match (outcome, exited) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(exit_err)) => Err(exit_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(exit_err)) => {
            report.fatal(format!("failed to restore pre-maintenance values: {exit_err}"));
            Err(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Originals {
    ingress_class: Option<String>,
    config_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum WindowState {
    #[default]
    Normal,
    Maintenance(Originals),
}

/// Window switching an ingress class and a config-map value.
pub struct ClusterMaintenance {
    control: Arc<dyn ClusterControl>,
    details: MaintenanceDetails,
    settle_delay: Duration,
    state: WindowState,
}

impl ClusterMaintenance {
    pub fn new(control: Arc<dyn ClusterControl>, details: MaintenanceDetails) -> Self {
        Self {
            control,
            details,
            settle_delay: SETTLE_DELAY,
            state: WindowState::Normal,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    async fn switch_on(&self, report: &Report) -> Result<()> {
        self.control
            .set_config_value(report, &self.details.config_value_ref, &self.details.config_value)
            .await?;
        self.control
            .set_ingress_class(report, &self.details.ingress, Some(self.details.ingress_class.as_str()))
            .await
    }

    /// Write back both values; both writes are attempted.
    async fn restore(&self, report: &Report, originals: &Originals) -> Result<()> {
        let config = self
            .control
            .set_config_value(report, &self.details.config_value_ref, &originals.config_value)
            .await;
        let ingress = self
            .control
            .set_ingress_class(report, &self.details.ingress, originals.ingress_class.as_deref())
            .await;
        config.and(ingress)
    }
}

impl MaintenanceMode for ClusterMaintenance {
    fn enter<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.is_active() {
                return Err(DataManagerError::Other(anyhow::anyhow!(
                    "maintenance window already entered"
                )));
            }
            let report = report.sub_report("ClusterMaintenance", "SetUp");

            let originals = Originals {
                config_value: self
                    .control
                    .get_config_value(&report, &self.details.config_value_ref)
                    .await?,
                ingress_class: self
                    .control
                    .get_ingress_class(&report, &self.details.ingress)
                    .await?,
            };
            report.debug(format!("original values: {originals:?}"));

            if let Err(err) = self.switch_on(&report).await {
                report.fatal(format!("switching to maintenance failed: {err}"));
                if let Err(restore_err) = self.restore(&report, &originals).await {
                    report.fatal(format!("failed to restore pre-maintenance values: {restore_err}"));
                }
                return Err(err);
            }
            self.state = WindowState::Maintenance(originals);

            report.debug(format!("waiting {:?} for routing to settle", self.settle_delay));
            tokio::time::sleep(self.settle_delay).await;
            Ok(())
        })
    }

    fn exit<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report("ClusterMaintenance", "TearDown");
            let WindowState::Maintenance(originals) = &self.state else {
                report.debug("not in maintenance, nothing to restore");
                return Ok(());
            };
            // Originals stay captured until they are written back.
            self.restore(&report, originals).await?;
            self.state = WindowState::Normal;
            Ok(())
        })
    }

    fn is_active(&self) -> bool {
        matches!(self.state, WindowState::Maintenance(_))
    }
}

/// Window for environments without redirection: transitions only log.
#[derive(Debug, Default)]
pub struct NoopMaintenance {
    active: bool,
}

impl NoopMaintenance {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaintenanceMode for NoopMaintenance {
    fn enter<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            report.notify("Set up maintenance mode does not do anything since Noop Maintenance Mode");
            self.active = true;
            Ok(())
        })
    }

    fn exit<'a>(&'a mut self, report: &'a Report) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            report.notify("Tear down maintenance mode does not do anything since Noop Maintenance Mode");
            self.active = false;
            Ok(())
        })
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_window_tracks_state_and_passes_errors_through() {
        let mut window = NoopMaintenance::new();
        let report = Report::root("test");

        let value = within_maintenance(&mut window, &report, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!window.is_active());

        let failed: Result<()> = within_maintenance(&mut window, &report, async {
            Err(DataManagerError::IntegrityError("boom".into()))
        })
        .await;
        assert!(matches!(failed, Err(DataManagerError::IntegrityError(_))));
        assert!(!window.is_active());
    }
}
