//! Cache key derivation for intercepted requests.
//!
//! Document-fetch API calls carry a cache-busting timestamp parameter that
//! changes on every call while the document stays the same. The key for such
//! a call is its URL cut at the timestamp marker; every other request is
//! keyed by its URL. Fragments are dropped from every key.

use std::borrow::Cow;

use shellcache_core::{AppConfig, Error};
use url::Url;

use crate::request::Request;

/// Maps requests to the key they are read and written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNormalizer {
    document_markers: Vec<String>,
    volatile_marker: String,
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl KeyNormalizer {
    pub fn new(document_markers: Vec<String>, volatile_marker: impl Into<String>) -> Self {
        Self { document_markers, volatile_marker: volatile_marker.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.document_fetch_markers.clone(), config.volatile_marker.clone())
    }

    /// True if the URL is a document-fetch API call.
    pub fn is_document_fetch(&self, url: &str) -> bool {
        self.document_markers.iter().any(|marker| url.contains(marker.as_str()))
    }

    /// Canonical form of a URL.
    ///
    /// Document fetches are cut at the first volatile marker. A URL without
    /// the marker, or that isn't a document fetch, comes back unchanged.
    pub fn normalize_url<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if !self.is_document_fetch(url) {
            return Cow::Borrowed(url);
        }
        match url.find(self.volatile_marker.as_str()) {
            Some(index) => Cow::Owned(url[..index].to_string()),
            None => Cow::Borrowed(url),
        }
    }

    /// The key a request is stored and looked up under.
    ///
    /// The fragment never reaches the server, so it is not part of the key.
    pub fn cache_key(&self, request: &Request) -> String {
        let mut url = request.url.clone();
        url.set_fragment(None);
        self.normalize_url(url.as_str()).into_owned()
    }

    /// A copy of the request addressed at its canonical URL.
    ///
    /// Only the URL differs from the original; method, headers, mode,
    /// credentials, redirect policy, referrer, referrer policy, integrity,
    /// cache directive and body are carried over.
    pub fn normalize(&self, request: &Request) -> Result<Request, Error> {
        let canonical = self.cache_key(request);
        if canonical == request.url.as_str() {
            return Ok(request.clone());
        }
        let url = Url::parse(&canonical).map_err(|e| Error::InvalidUrl(format!("{canonical}: {e}")))?;
        Ok(request.with_url(url))
    }
}
