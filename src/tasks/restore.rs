// src/tasks/restore.rs

//! Restore task: readiness, then every subtask inside the maintenance
//! window. The working directory is filled beforehand by `setup`.

use crate::errors::Result;
use crate::maintenance::{within_maintenance, MaintenanceMode};
use crate::readiness::ContainersReadiness;
use crate::report::Report;
use crate::tasks::subtask::RestoreSubtask;

pub struct RestoreTask {
    readiness: ContainersReadiness,
    subtasks: Vec<Box<dyn RestoreSubtask>>,
    maintenance: Box<dyn MaintenanceMode>,
}

impl RestoreTask {
    pub fn new(
        readiness: ContainersReadiness,
        subtasks: Vec<Box<dyn RestoreSubtask>>,
        maintenance: Box<dyn MaintenanceMode>,
    ) -> Self {
        Self {
            readiness,
            subtasks,
            maintenance,
        }
    }

    pub fn subtask_names(&self) -> Vec<&'static str> {
        self.subtasks.iter().map(|s| s.name()).collect()
    }

    pub async fn run(mut self, report: &Report) -> Result<()> {
        let mut report = report.sub_report_notify("Restore", "ComponentInitialized");

        report.set_status("AwaitReadiness");
        self.readiness.wait(&report).await?;

        report.set_status("Maintenance");
        let body_report = report.clone();
        let subtasks = &mut self.subtasks;
        within_maintenance(self.maintenance.as_mut(), &report, async {
            for subtask in subtasks.iter_mut() {
                subtask.run(&body_report).await?;
            }
            Ok(())
        })
        .await?;

        report.set_status("Done");
        Ok(())
    }
}
