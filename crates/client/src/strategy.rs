//! Network-first fetch strategy with cache fallback.
//!
//! For each intercepted request:
//!
//! 1. `only-if-cached` requests outside `same-origin` mode are declined.
//! 2. Document-fetch API calls: non-GET goes straight to the network and is
//!    never cached. GET goes to the network with the original request; a 200
//!    is written under the normalized key, a network failure falls back to
//!    the normalized key.
//! 3. Everything else: network first. A 200 from the application origin for
//!    a GET with a visible URL is written under the request URL. A network
//!    failure falls back to the request URL. Fragments are not part of
//!    either key.
//!
//! Writes run on a spawned task. The response is returned without waiting
//! for them, so two requests racing on the same key end with whichever write
//! lands last.

use std::sync::Arc;

use reqwest::StatusCode;
use shellcache_core::{CacheEntry, CacheStorage};
use tokio::task::JoinHandle;
use url::Url;

use crate::fetch::{Transport, same_origin};
use crate::normalize::KeyNormalizer;
use crate::request::{CacheDirective, Request, RequestMode};
use crate::response::Response;

/// Where the answer to an intercepted request came from.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not handled; the host should apply its default behavior.
    Declined,
    /// Live response from the network.
    Network(Response),
    /// Network failed; served from the current generation.
    Cache(Response),
    /// Network failed and nothing was cached.
    Unavailable,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Network(response) | FetchOutcome::Cache(response) => Some(response),
            FetchOutcome::Declined | FetchOutcome::Unavailable => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            FetchOutcome::Network(response) | FetchOutcome::Cache(response) => Some(response),
            FetchOutcome::Declined | FetchOutcome::Unavailable => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Declined => "declined",
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Unavailable => "unavailable",
        }
    }
}

/// Result of handling one request.
///
/// `cache_write` is the background write-through, if one was started.
/// Dropping it detaches the write.
#[derive(Debug)]
pub struct Intercepted {
    pub outcome: FetchOutcome,
    pub cache_write: Option<JoinHandle<()>>,
}

impl Intercepted {
    fn new(outcome: FetchOutcome) -> Self {
        Self { outcome, cache_write: None }
    }

    /// Wait for the background write, if any, then return the outcome.
    pub async fn settle(self) -> FetchOutcome {
        if let Some(write) = self.cache_write
            && let Err(e) = write.await
        {
            tracing::warn!(error = %e, "cache write task did not complete");
        }
        self.outcome
    }
}

/// The per-request decision procedure.
pub struct FetchStrategy {
    store: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    normalizer: KeyNormalizer,
    generation: String,
    origin: Url,
}

impl FetchStrategy {
    pub fn new(
        store: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>, normalizer: KeyNormalizer,
        generation: impl Into<String>, origin: Url,
    ) -> Self {
        Self { store, transport, normalizer, generation: generation.into(), origin }
    }

    /// Handle one intercepted request.
    pub async fn handle(&self, request: &Request) -> Intercepted {
        // DevTools issues only-if-cached requests that cannot be answered here.
        if request.cache == CacheDirective::OnlyIfCached && request.mode != RequestMode::SameOrigin {
            tracing::debug!(url = %request.url, "declining only-if-cached request");
            return Intercepted::new(FetchOutcome::Declined);
        }

        if self.normalizer.is_document_fetch(request.url.as_str()) {
            self.handle_document_fetch(request).await
        } else {
            self.handle_resource(request).await
        }
    }

    async fn handle_document_fetch(&self, request: &Request) -> Intercepted {
        if !request.is_get() {
            return match self.transport.fetch(request).await {
                Ok(response) => Intercepted::new(FetchOutcome::Network(response)),
                Err(e) => {
                    tracing::warn!(method = %request.method, url = %request.url, error = %e, "network request failed");
                    Intercepted::new(FetchOutcome::Unavailable)
                }
            };
        }

        let key = self.normalizer.cache_key(request);

        match self.transport.fetch(request).await {
            Ok(response) => {
                let cache_write = self.write_through(key, &response);
                Intercepted { outcome: FetchOutcome::Network(response), cache_write }
            }
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "network request failed, serving content from cache");
                self.from_cache(&key).await
            }
        }
    }

    async fn handle_resource(&self, request: &Request) -> Intercepted {
        let key = self.normalizer.cache_key(request);

        match self.transport.fetch(request).await {
            Ok(response) => {
                let cacheable = match &response.url {
                    // foreign no-cors responses are opaque and carry no URL
                    None => false,
                    Some(url) => request.is_get() && same_origin(url, &self.origin),
                };

                let cache_write = if cacheable { self.write_through(key, &response) } else { None };
                Intercepted { outcome: FetchOutcome::Network(response), cache_write }
            }
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "network request failed, serving content from cache");
                self.from_cache(&key).await
            }
        }
    }

    /// Start a background write of `response` under `key`. Only a 200 is written.
    fn write_through(&self, key: String, response: &Response) -> Option<JoinHandle<()>> {
        if response.status != StatusCode::OK {
            tracing::debug!(url = %key, status = response.status.as_u16(), "not caching non-200 response");
            return None;
        }

        let entry = CacheEntry { request_method: "GET".to_string(), request_url: key, response: response.to_stored() };
        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();

        Some(tokio::spawn(async move {
            match store.put(&generation, &entry).await {
                Ok(()) => tracing::debug!(generation = %generation, url = %entry.request_url, "updated cache entry"),
                Err(e) => {
                    tracing::warn!(generation = %generation, url = %entry.request_url, error = %e, "cache write failed")
                }
            }
        }))
    }

    async fn from_cache(&self, key: &str) -> Intercepted {
        let outcome = match self.store.match_entry(&self.generation, "GET", key).await {
            Ok(Some(stored)) => match Response::from_stored(stored) {
                Ok(response) => {
                    tracing::debug!(url = %key, "serving cached response");
                    FetchOutcome::Cache(response)
                }
                Err(e) => {
                    tracing::warn!(url = %key, error = %e, "discarding unreadable cache entry");
                    FetchOutcome::Unavailable
                }
            },
            Ok(None) => {
                tracing::info!(url = %key, "no match found in cache");
                FetchOutcome::Unavailable
            }
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "cache lookup failed");
                FetchOutcome::Unavailable
            }
        };
        Intercepted::new(outcome)
    }
}
