// src/services/identity.rs

//! Identity-provider admin API.

use serde_json::Value;

use crate::errors::{DataManagerError, Result};
use crate::report::Report;
use crate::types::BoxFuture;

pub trait IdentityAdmin: Send + Sync {
    /// The `systemInfo` section of the server info endpoint.
    fn system_info<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<Value>>;
}

/// [`IdentityAdmin`] over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpIdentityAdmin {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpIdentityAdmin {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    pub fn server_info_url(&self) -> String {
        format!("{}/admin/serverinfo", self.base_url)
    }
}

impl IdentityAdmin for HttpIdentityAdmin {
    fn system_info<'a>(&'a self, report: &'a Report) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let report = report.sub_report("system_info", "in function");
            let url = self.server_info_url();
            report.debug(format!("GET {url}"));

            let mut request = self.client.get(&url);
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }
            let mut doc: Value = request.send().await?.error_for_status()?.json().await?;

            doc.get_mut("systemInfo")
                .map(Value::take)
                .ok_or_else(|| DataManagerError::NotFound(format!("no systemInfo in {url} response")))
        })
    }
}
