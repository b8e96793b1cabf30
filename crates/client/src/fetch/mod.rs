//! Network transport for intercepted requests.
//!
//! ### Transport contract
//! - One attempt per call, no retries.
//! - HTTP error statuses are responses; only transport failures are errors.
//!
//! ### Request handling
//! - Method, headers and body are forwarded as given.
//! - Credentials: `omit` strips cookies and authorization, `same-origin`
//!   strips them for other origins.
//! - Redirects: `follow` follows up to `max_redirects`, `manual` returns the
//!   3xx response, `error` fails on a 3xx.
//! - A `no-cors` request to another origin yields an opaque response.
//! - The referrer policy decides how much of the referrer goes in `Referer`;
//!   the policy itself is not sent.
//! - Max body bytes: 5MB (configurable).

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use shellcache_core::{AppConfig, Error};
use std::time::{Duration, Instant};

use crate::request::{Credentials, RedirectPolicy, Request, RequestMode};
use crate::response::Response;

pub use url::{UrlError, resolve, same_origin};

/// The network primitive the worker forwards requests through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. An `Err` means the network attempt was rejected.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin of the application; decides same-origin credential and opacity rules.
    pub origin: ::url::Url,

    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Defaults for everything but the origin.
    pub fn new(origin: ::url::Url) -> Self {
        Self {
            origin,
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        })
    }
}

/// reqwest-backed [`Transport`].
pub struct FetchClient {
    http: Client,
    http_manual: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Self::builder(&config)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        let http_manual = Self::builder(&config)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, http_manual, config })
    }

    fn builder(config: &FetchConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
    }

    fn sends_credentials(&self, request: &Request) -> bool {
        match request.credentials {
            Credentials::Omit => false,
            Credentials::SameOrigin => same_origin(&request.url, &self.config.origin),
            Credentials::Include => true,
        }
    }

    fn outbound_headers(&self, request: &Request) -> header::HeaderMap {
        let mut headers = request.headers.clone();
        if !self.sends_credentials(request) {
            headers.remove(header::COOKIE);
            headers.remove(header::AUTHORIZATION);
        }
        if let Some(referer) = referer(request)
            && let Ok(value) = header::HeaderValue::from_str(&referer)
        {
            headers.insert(header::REFERER, value);
        }
        headers
    }
}

/// The `Referer` sent for a request once its referrer policy is applied.
///
/// Fragments and userinfo never leave. An unset or unknown policy behaves
/// as `strict-origin-when-cross-origin`.
fn referer(request: &Request) -> Option<String> {
    let mut referrer = ::url::Url::parse(request.referrer.as_deref()?)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))?;
    referrer.set_fragment(None);
    let _ = referrer.set_username("");
    let _ = referrer.set_password(None);

    let origin_only = format!("{}/", referrer.origin().ascii_serialization());
    let same = same_origin(&request.url, &referrer);
    let downgrade = referrer.scheme() == "https" && request.url.scheme() != "https";
    let full = String::from(referrer);

    match request.referrer_policy.as_deref().unwrap_or_default() {
        "no-referrer" => None,
        "origin" => Some(origin_only),
        "unsafe-url" => Some(full),
        "same-origin" => same.then_some(full),
        "strict-origin" => (!downgrade).then_some(origin_only),
        "origin-when-cross-origin" => Some(if same { full } else { origin_only }),
        "no-referrer-when-downgrade" => (!downgrade).then_some(full),
        _ if same => Some(full),
        _ => (!downgrade).then_some(origin_only),
    }
}

#[async_trait]
impl Transport for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let client = match request.redirect {
            RedirectPolicy::Follow => &self.http,
            RedirectPolicy::Error | RedirectPolicy::Manual => &self.http_manual,
        };

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(self.outbound_headers(request));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        let status = response.status();

        if status.is_redirection() && request.redirect == RedirectPolicy::Error {
            return Err(Error::RedirectRefused(format!("{} returned {}", request.url, status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let opaque = request.mode == RequestMode::NoCors && !same_origin(&request.url, &self.config.origin);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = bytes.len(),
            opaque,
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched from network"
        );

        Ok(Response::new((!opaque).then_some(final_url), status, headers, bytes))
    }
}
