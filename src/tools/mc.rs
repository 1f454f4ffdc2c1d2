// src/tools/mc.rs

//! Object-store client (`mc --json`) commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::errors::{DataManagerError, Result};
use crate::exec::{JsonLinesRunner, ProcessBackend, ProgressThrottle};
use crate::report::Report;

pub const ALIAS_LOCAL: &str = "local";
pub const ALIAS_CLUSTER: &str = "cluster";

/// Delay before re-reading the target of a mirror whose disk usage did not
/// match the source yet.
pub const MIRROR_RECHECK_DELAY: Duration = Duration::from_secs(5);

/// How many times a mismatching mirror target is re-read.
pub const MIRROR_RECHECK_ATTEMPTS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key: String,
    pub secret_key: String,
}

/// An S3 endpoint reachable by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Instance {
    pub credentials: S3Credentials,
    pub host: String,
    pub tls: bool,
    pub port: u16,
}

impl S3Instance {
    /// The store running next to this job: `localhost`, no TLS.
    pub fn local(access_key: impl Into<String>, secret_key: impl Into<String>, port: u16) -> Self {
        Self {
            credentials: S3Credentials {
                access_key: access_key.into(),
                secret_key: secret_key.into(),
            },
            host: "localhost".to_string(),
            tls: false,
            port,
        }
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn health_live_url(&self) -> String {
        format!("{}/minio/health/live", self.base_url())
    }
}

/// Object count and total bytes of a bucket, versions included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskUsage {
    pub objects: u64,
    pub size: u64,
}

impl DiskUsage {
    fn from_record(doc: &Value) -> Result<Self> {
        let field = |name: &str| {
            doc.get(name).and_then(Value::as_u64).ok_or_else(|| {
                DataManagerError::ToolError(format!("du record without numeric `{name}`: {doc}"))
            })
        };
        Ok(Self {
            objects: field("objects")?,
            size: field("size")?,
        })
    }
}

pub struct McCommands {
    runner: JsonLinesRunner,
    local: S3Instance,
    cluster: S3Instance,
    aliases: OnceCell<()>,
}

impl McCommands {
    pub fn new(
        backend: Arc<dyn ProcessBackend>,
        mc_binary: impl AsRef<Path>,
        mc_config_dir: impl AsRef<Path>,
        local: S3Instance,
        cluster: S3Instance,
    ) -> Self {
        let leading_args = vec![
            "--json".to_string(),
            "--config-dir".to_string(),
            mc_config_dir.as_ref().display().to_string(),
        ];
        Self {
            runner: JsonLinesRunner::new(backend, mc_binary, leading_args),
            local,
            cluster,
            aliases: OnceCell::new(),
        }
    }

    pub fn local(&self) -> &S3Instance {
        &self.local
    }

    pub fn cluster_url(&self) -> String {
        self.cluster.base_url()
    }

    /// Register both aliases, once per process. Later calls are no-ops.
    async fn ensure_aliases(&self, report: &Report) -> Result<()> {
        self.aliases
            .get_or_try_init(|| async {
                self.set_alias(report, ALIAS_LOCAL, &self.local).await?;
                self.set_alias(report, ALIAS_CLUSTER, &self.cluster).await?;
                Ok::<(), DataManagerError>(())
            })
            .await?;
        Ok(())
    }

    async fn set_alias(&self, report: &Report, alias: &str, instance: &S3Instance) -> Result<()> {
        let report = report.sub_report(format!("alias_{alias}"), "in function");
        let args = strings(&[
            "alias",
            "set",
            alias,
            &instance.base_url(),
            &instance.credentials.access_key,
            &instance.credentials.secret_key,
        ]);
        self.runner.run_sensitive(&report, &args, |_| Ok(())).await?;
        report.debug(format!("alias {alias} -> {}", instance.base_url()));
        Ok(())
    }

    /// `admin info cluster`, returning the `info` field.
    pub async fn cluster_info(&self, report: &Report) -> Result<Value> {
        self.ensure_aliases(report).await?;
        let report = report.sub_report("admin_info", "in function");

        let mut info = Value::Null;
        self.runner
            .run(&report, &strings(&["admin", "info", ALIAS_CLUSTER]), |doc| {
                if let Some(v) = doc.get("info") {
                    info = v.clone();
                }
                Ok(())
            })
            .await?;
        Ok(info)
    }

    /// `du --versions <target>`; the last success record wins.
    pub async fn disk_usage(&self, report: &Report, target: &str) -> Result<DiskUsage> {
        self.ensure_aliases(report).await?;

        let mut usage = None;
        self.runner
            .run(report, &strings(&["du", "--versions", target]), |doc| {
                report.debug(format!("du record: {doc}"));
                usage = Some(DiskUsage::from_record(doc)?);
                Ok(())
            })
            .await?;

        usage.ok_or_else(|| DataManagerError::ToolError(format!("no disk usage reported for {target}")))
    }

    pub async fn du_cluster_bucket(&self, report: &Report, bucket: &str) -> Result<DiskUsage> {
        let report = report.sub_report(format!("du_cluster_bucket_{bucket}"), "in function");
        self.disk_usage(&report, &format!("{ALIAS_CLUSTER}/{bucket}")).await
    }

    /// Create the local bucket if absent, then mirror cluster to local.
    pub async fn backup_bucket(&self, report: &Report, bucket: &str) -> Result<()> {
        self.ensure_aliases(report).await?;
        let mut report = report.sub_report(format!("backup_{bucket}"), "in function");
        let source = format!("{ALIAS_CLUSTER}/{bucket}");
        let target = format!("{ALIAS_LOCAL}/{bucket}");

        report.set_status("CreateLocalBucket");
        self.runner
            .run_quiet(&report, &strings(&["mb", "--ignore-existing", &target]))
            .await?;

        report.set_status("Transfer");
        self.mirror(&report, &source, &target).await?;
        report.set_status("exit function");
        Ok(())
    }

    /// Optionally force-remove the cluster bucket, create it, then mirror
    /// local to cluster.
    pub async fn restore_bucket(&self, report: &Report, bucket: &str, remove_existing: bool) -> Result<()> {
        self.ensure_aliases(report).await?;
        let mut report = report.sub_report(format!("restore_{bucket}"), "in function");
        let source = format!("{ALIAS_LOCAL}/{bucket}");
        let target = format!("{ALIAS_CLUSTER}/{bucket}");

        if remove_existing {
            report.set_status("RemoveClusterBucket");
            self.runner
                .run_quiet(&report, &strings(&["rb", "--force", &target]))
                .await?;
        }

        report.set_status("CreateClusterBucket");
        self.runner.run_quiet(&report, &strings(&["mb", &target])).await?;

        report.set_status("Transfer");
        self.mirror(&report, &source, &target).await?;
        report.set_status("exit function");
        Ok(())
    }

    /// `admin service stop local`.
    pub async fn stop_local(&self, report: &Report) -> Result<()> {
        self.ensure_aliases(report).await?;
        let report = report.sub_report("stop_local", "in function");
        self.runner
            .run_quiet(&report, &strings(&["admin", "service", "stop", ALIAS_LOCAL]))
            .await
    }

    /// Mirror `source` onto `target`, then check both sides match.
    pub async fn mirror(&self, report: &Report, source: &str, target: &str) -> Result<()> {
        self.ensure_aliases(report).await?;
        let mut report = report.sub_report("MirrorBucket", "in function");

        report.set_status("DiskUsageSourceBucket");
        let expected = self.disk_usage(&report, source).await?;
        report.notify(format!(
            "source bucket : {} objects / {} bytes",
            expected.objects, expected.size
        ));

        report.set_status("Transfer");
        let mut throttle = ProgressThrottle::default();
        self.runner
            .run(
                &report,
                &strings(&["mirror", "--overwrite", "--preserve", "--remove", source, target]),
                |doc| {
                    if doc.get("target").is_some() && throttle.ready() {
                        let transferred = doc.get("totalCount").and_then(Value::as_u64).unwrap_or(0);
                        report.debug(format!(
                            "transferred {transferred} objects on {}",
                            expected.objects
                        ));
                    }
                    Ok(())
                },
            )
            .await?;
        report.notify("Done");

        report.set_status("VerifyTargetBucket");
        let mut actual = self.disk_usage(&report, target).await?;
        let mut rechecks = 0;
        while actual != expected && rechecks < MIRROR_RECHECK_ATTEMPTS {
            rechecks += 1;
            report.debug(format!(
                "target {target} at {} / {}, re-checking in {:?}",
                actual.objects, actual.size, MIRROR_RECHECK_DELAY
            ));
            tokio::time::sleep(MIRROR_RECHECK_DELAY).await;
            actual = self.disk_usage(&report, target).await?;
        }

        if actual != expected {
            let msg = format!(
                "Mirror {source} to {target} failed: expected {} / {} actual {} / {}",
                expected.objects, expected.size, actual.objects, actual.size
            );
            report.fatal(&msg);
            return Err(DataManagerError::IntegrityError(msg));
        }

        report.set_status("exit function");
        Ok(())
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn urls_follow_tls_flag() {
        let local = S3Instance::local("minio", "minio123", 9000);
        assert_eq!(local.base_url(), "http://localhost:9000");
        assert_eq!(local.health_live_url(), "http://localhost:9000/minio/health/live");

        let cluster = S3Instance {
            credentials: S3Credentials {
                access_key: "ak".into(),
                secret_key: "sk".into(),
            },
            host: "minio.cluster".into(),
            tls: true,
            port: 443,
        };
        assert_eq!(cluster.base_url(), "https://minio.cluster:443");
    }

    #[test]
    fn disk_usage_requires_numeric_fields() {
        let usage = DiskUsage::from_record(&json!({"status": "success", "objects": 10, "size": 500})).unwrap();
        assert_eq!(usage, DiskUsage { objects: 10, size: 500 });

        assert!(DiskUsage::from_record(&json!({"status": "success", "size": 500})).is_err());
        assert!(DiskUsage::from_record(&json!({"objects": "ten", "size": 500})).is_err());
    }
}
