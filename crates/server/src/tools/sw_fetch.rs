//! sw_fetch tool implementation.
//!
//! Delivers a fetch signal: the request goes through the worker's
//! network-first strategy and the answer is reported with its source.

use std::collections::BTreeMap;

use reqwest::Method;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_client::{CacheDirective, Credentials, RedirectPolicy, Request, RequestMode, ServiceWorker};
use shellcache_core::Error;

use super::json_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL, absolute or relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub mode: RequestMode,

    #[serde(default)]
    pub credentials: Credentials,

    /// Cache directive, e.g. "default" or "only-if-cached".
    #[serde(default)]
    pub cache: CacheDirective,

    #[serde(default)]
    pub redirect: RedirectPolicy,

    #[serde(default)]
    pub referrer: Option<String>,

    #[serde(default)]
    pub referrer_policy: Option<String>,

    #[serde(default)]
    pub integrity: Option<String>,

    /// Request body as text.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// "network", "cache", "declined" or "unavailable".
    pub source: String,
    pub status: Option<u16>,
    /// Final response URL; absent for opaque responses and when there is no response.
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
}

impl SwFetchParams {
    fn into_request(self, worker: &ServiceWorker) -> Result<Request, Error> {
        let url = resolve(&self.url, worker.origin()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid HTTP method: {}", self.method)))?;

        let mut request = Request::new(method, url)
            .with_mode(self.mode)
            .with_credentials(self.credentials)
            .with_cache(self.cache)
            .with_redirect(self.redirect);
        for (name, value) in &self.headers {
            request = request.with_header(name, value)?;
        }
        request.referrer = self.referrer;
        request.referrer_policy = self.referrer_policy;
        request.integrity = self.integrity;
        if let Some(body) = self.body {
            request = request.with_body(body);
        }
        Ok(request)
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = params.into_request(worker)?;
    let intercepted = worker.fetch(&request).await;

    // the write-through keeps running after the reply
    let outcome = intercepted.outcome;
    let source = outcome.source().to_string();

    let output = match outcome.into_response() {
        Some(response) => SwFetchOutput {
            source,
            status: Some(response.status.as_u16()),
            url: response.url.as_ref().map(ToString::to_string),
            headers: response
                .headers
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect(),
            body: Some(response.text_lossy()),
        },
        None => SwFetchOutput { source, status: None, url: None, headers: Vec::new(), body: None },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{offline_worker, text_of};
    use shellcache_core::{CacheEntry, StoredResponse};

    fn params(url: &str) -> SwFetchParams {
        serde_json::from_value(serde_json::json!({ "url": url })).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (_db, worker) = offline_worker().await;
        let result = fetch_impl(&worker, params("")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let (_db, worker) = offline_worker().await;
        let mut p = params("/app");
        p.method = "GE T".into();
        assert!(fetch_impl(&worker, p).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_offline_miss_is_unavailable() {
        let (_db, worker) = offline_worker().await;

        let result = fetch_impl(&worker, params("/app")).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(output.source, "unavailable");
        assert!(output.status.is_none());
    }

    #[tokio::test]
    async fn test_fetch_offline_served_from_cache() {
        let (db, worker) = offline_worker().await;
        db.put_entry(
            worker.generation(),
            &CacheEntry {
                request_method: "GET".into(),
                request_url: "https://erp.example.com/app".into(),
                response: StoredResponse {
                    url: Some("https://erp.example.com/app".into()),
                    status_code: 200,
                    headers: vec![("content-type".into(), "text/html".into())],
                    body: b"<html>desk</html>".to_vec(),
                    stored_at: chrono::Utc::now().to_rfc3339(),
                },
            },
        )
        .await
        .unwrap();

        let result = fetch_impl(&worker, params("/app")).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(output.source, "cache");
        assert_eq!(output.status, Some(200));
        assert_eq!(output.body.as_deref(), Some("<html>desk</html>"));
    }

    #[tokio::test]
    async fn test_fetch_only_if_cached_declined() {
        let (_db, worker) = offline_worker().await;
        let p: SwFetchParams =
            serde_json::from_value(serde_json::json!({ "url": "/app", "cache": "only-if-cached", "mode": "no-cors" }))
                .unwrap();

        let result = fetch_impl(&worker, p).await.unwrap();
        let output: SwFetchOutput = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(output.source, "declined");
    }
}
