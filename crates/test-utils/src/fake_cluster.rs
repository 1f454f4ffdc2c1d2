use std::collections::HashMap;
use std::sync::Mutex;

use data_manager::errors::{DataManagerError, Result};
use data_manager::report::Report;
use data_manager::services::{ClusterControl, ConfigValueRef, IngressRef};
use data_manager::types::BoxFuture;

/// One mutation applied to the fake cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterWrite {
    IngressClass { ingress: IngressRef, class: Option<String> },
    ConfigValue { value: ConfigValueRef, data: String },
}

#[derive(Default)]
struct State {
    ingress_classes: HashMap<IngressRef, Option<String>>,
    config_values: HashMap<ConfigValueRef, String>,
    writes: Vec<ClusterWrite>,
    /// Fail the n-th write (0-based) and every one after it while set.
    fail_writes_from: Option<usize>,
    fail_reads: bool,
}

/// In-memory [`ClusterControl`] with write history and failure injection.
#[derive(Default)]
pub struct InMemoryClusterControl {
    state: Mutex<State>,
}

impl InMemoryClusterControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ingress(self, ingress: &IngressRef, class: Option<&str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .ingress_classes
            .insert(ingress.clone(), class.map(str::to_string));
        self
    }

    pub fn with_config_value(self, value: &ConfigValueRef, data: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .config_values
            .insert(value.clone(), data.to_string());
        self
    }

    /// Make every write starting from the `n`-th one fail.
    pub fn fail_writes_from(&self, n: usize) {
        self.state.lock().unwrap().fail_writes_from = Some(n);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_writes_from = None;
        state.fail_reads = false;
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn ingress_class(&self, ingress: &IngressRef) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .ingress_classes
            .get(ingress)
            .cloned()
            .flatten()
    }

    pub fn config_value(&self, value: &ConfigValueRef) -> Option<String> {
        self.state.lock().unwrap().config_values.get(value).cloned()
    }

    pub fn writes(&self) -> Vec<ClusterWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    fn record(&self, write: ClusterWrite) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let index = state.writes.len();
        state.writes.push(write.clone());
        if state.fail_writes_from.is_some_and(|n| index >= n) {
            return Err(DataManagerError::ToolError(format!("injected failure on {write:?}")));
        }
        match write {
            ClusterWrite::IngressClass { ingress, class } => {
                state.ingress_classes.insert(ingress, class);
            }
            ClusterWrite::ConfigValue { value, data } => {
                state.config_values.insert(value, data);
            }
        }
        Ok(())
    }
}

impl ClusterControl for InMemoryClusterControl {
    fn get_ingress_class<'a>(
        &'a self,
        _report: &'a Report,
        ingress: &'a IngressRef,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.fail_reads {
                return Err(DataManagerError::ToolError("injected read failure".to_string()));
            }
            state
                .ingress_classes
                .get(ingress)
                .cloned()
                .ok_or_else(|| DataManagerError::NotFound(format!("ingress {ingress}")))
        })
    }

    fn set_ingress_class<'a>(
        &'a self,
        _report: &'a Report,
        ingress: &'a IngressRef,
        class: Option<&'a str>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(ClusterWrite::IngressClass {
                ingress: ingress.clone(),
                class: class.map(str::to_string),
            })
        })
    }

    fn get_config_value<'a>(&'a self, _report: &'a Report, value: &'a ConfigValueRef) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.fail_reads {
                return Err(DataManagerError::ToolError("injected read failure".to_string()));
            }
            state
                .config_values
                .get(value)
                .cloned()
                .ok_or_else(|| DataManagerError::NotFound(format!("config value {value}")))
        })
    }

    fn set_config_value<'a>(
        &'a self,
        _report: &'a Report,
        value: &'a ConfigValueRef,
        data: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(ClusterWrite::ConfigValue {
                value: value.clone(),
                data: data.to_string(),
            })
        })
    }
}
