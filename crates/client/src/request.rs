//! Intercepted request model.
//!
//! A [`Request`] carries every property a client may set on an outbound
//! call. The worker never mutates one; normalization produces a copy with a
//! different URL.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::Error;
use url::Url;

/// Request mode, as set by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// Whether credentials (cookies, authorization) accompany the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// How redirects returned by the origin are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    #[default]
    Follow,
    Error,
    Manual,
}

/// The client's HTTP cache directive for the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CacheDirective {
    #[default]
    Default,
    NoStore,
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// An outbound call intercepted by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub credentials: Credentials,
    pub redirect: RedirectPolicy,
    pub referrer: Option<String>,
    pub referrer_policy: Option<String>,
    pub integrity: Option<String>,
    pub cache: CacheDirective,
    pub body: Option<Bytes>,
}

impl Request {
    /// A request with client defaults for everything but method and URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            mode: RequestMode::default(),
            credentials: Credentials::default(),
            redirect: RedirectPolicy::default(),
            referrer: None,
            referrer_policy: None,
            integrity: None,
            cache: CacheDirective::default(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse a method name and absolute URL into a request.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid HTTP method: {method}")))?;
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Copy of this request pointing at another URL. Every other property is kept.
    pub fn with_url(&self, url: Url) -> Self {
        Self { url, ..self.clone() }
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache(mut self, cache: CacheDirective) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_redirect(mut self, redirect: RedirectPolicy) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid header name {name}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("invalid header value: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}
