// src/services/cluster.rs

//! Cluster control plane: ingress class and config-map values.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::{DataManagerError, Result};
use crate::exec::{Invocation, ProcessBackend};
use crate::report::Report;
use crate::types::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngressRef {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for IngressRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One data entry of a config map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigValueRef {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

impl fmt::Display for ConfigValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.namespace, self.name, self.key)
    }
}

/// Read/write access to the two values the maintenance window swaps.
pub trait ClusterControl: Send + Sync {
    /// `None` when the ingress has no class.
    fn get_ingress_class<'a>(&'a self, report: &'a Report, ingress: &'a IngressRef)
        -> BoxFuture<'a, Result<Option<String>>>;

    /// `None` removes the class.
    fn set_ingress_class<'a>(
        &'a self,
        report: &'a Report,
        ingress: &'a IngressRef,
        class: Option<&'a str>,
    ) -> BoxFuture<'a, Result<()>>;

    fn get_config_value<'a>(&'a self, report: &'a Report, value: &'a ConfigValueRef) -> BoxFuture<'a, Result<String>>;

    fn set_config_value<'a>(
        &'a self,
        report: &'a Report,
        value: &'a ConfigValueRef,
        data: &'a str,
    ) -> BoxFuture<'a, Result<()>>;
}

/// [`ClusterControl`] through the `kubectl` binary.
pub struct KubectlClusterControl {
    backend: Arc<dyn ProcessBackend>,
    kubectl: PathBuf,
    context: Option<String>,
}

impl KubectlClusterControl {
    pub fn new(backend: Arc<dyn ProcessBackend>, kubectl: impl AsRef<Path>, context: Option<String>) -> Self {
        Self {
            backend,
            kubectl: kubectl.as_ref().to_path_buf(),
            context,
        }
    }

    fn invocation(&self, namespace: &str) -> Invocation {
        let mut inv = Invocation::new(&self.kubectl);
        if let Some(ctx) = &self.context {
            inv = inv.args(["--context", ctx.as_str()]);
        }
        inv.args(["--namespace", namespace])
    }

    async fn run(&self, report: &Report, invocation: Invocation) -> Result<String> {
        report.debug(format!("run {invocation}"));
        let output = self.backend.capture(&invocation).await?;
        if !output.success() {
            let msg = format!("kubectl exited with code {}: {}", output.code, output.stderr.trim());
            report.fatal(&msg);
            return Err(DataManagerError::ToolError(msg));
        }
        Ok(output.stdout)
    }
}

impl ClusterControl for KubectlClusterControl {
    fn get_ingress_class<'a>(
        &'a self,
        report: &'a Report,
        ingress: &'a IngressRef,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let report = report.sub_report(format!("get_ingress_class_name[{ingress}]"), "in function");
            let out = self
                .run(
                    &report,
                    self.invocation(&ingress.namespace).args([
                        "get",
                        "ingress",
                        ingress.name.as_str(),
                        "--output",
                        "json",
                    ]),
                )
                .await?;
            let doc: Value = serde_json::from_str(&out)?;
            let spec = doc
                .get("spec")
                .ok_or_else(|| DataManagerError::NotFound(format!("Ingress '{ingress}' has no spec")))?;
            let class = spec
                .get("ingressClassName")
                .and_then(Value::as_str)
                .map(str::to_string);
            report.debug(format!("result={class:?}"));
            Ok(class)
        })
    }

    fn set_ingress_class<'a>(
        &'a self,
        report: &'a Report,
        ingress: &'a IngressRef,
        class: Option<&'a str>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report(format!("set_ingress_class_name[{ingress}]"), "in function");
            report.debug(format!("value={class:?}"));
            let patch = json!({ "spec": { "ingressClassName": class } });
            self.run(
                &report,
                self.invocation(&ingress.namespace).args([
                    "patch".to_string(),
                    "ingress".to_string(),
                    ingress.name.clone(),
                    "--type".to_string(),
                    "merge".to_string(),
                    "--patch".to_string(),
                    patch.to_string(),
                ]),
            )
            .await?;
            Ok(())
        })
    }

    fn get_config_value<'a>(&'a self, report: &'a Report, value: &'a ConfigValueRef) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let report = report.sub_report(format!("get_config_map_value[{value}]"), "in function");
            let out = self
                .run(
                    &report,
                    self.invocation(&value.namespace).args([
                        "get",
                        "configmap",
                        value.name.as_str(),
                        "--output",
                        "json",
                    ]),
                )
                .await?;
            let doc: Value = serde_json::from_str(&out)?;
            let data = doc
                .get("data")
                .ok_or_else(|| DataManagerError::NotFound(format!("ConfigMap '{value}' has no data")))?;
            let entry = data.get(&value.key).and_then(Value::as_str).ok_or_else(|| {
                DataManagerError::NotFound(format!("ConfigMap data entry '{value}' does not exist"))
            })?;
            Ok(entry.to_string())
        })
    }

    fn set_config_value<'a>(
        &'a self,
        report: &'a Report,
        value: &'a ConfigValueRef,
        data: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let report = report.sub_report(format!("set_config_map_value[{value}]"), "in function");
            report.debug(format!("value={data}"));
            let mut entries = serde_json::Map::new();
            entries.insert(value.key.clone(), Value::String(data.to_string()));
            let patch = json!({ "data": entries });
            self.run(
                &report,
                self.invocation(&value.namespace).args([
                    "patch".to_string(),
                    "configmap".to_string(),
                    value.name.clone(),
                    "--type".to_string(),
                    "merge".to_string(),
                    "--patch".to_string(),
                    patch.to_string(),
                ]),
            )
            .await?;
            Ok(())
        })
    }
}
