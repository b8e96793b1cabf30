//! Install-time population of the current generation with the app shell.

use std::sync::Arc;

use futures_util::future::join_all;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::config::{ICON_TOKEN, VERSION_TOKEN};
use shellcache_core::{AppConfig, CacheEntry, CacheStorage, Error};
use url::Url;

use crate::fetch::{Transport, resolve};
use crate::request::Request;

/// The shell URLs to precache, with build-time tokens substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    urls: Vec<Url>,
}

impl PrecacheManifest {
    /// Substitute the version and icon tokens and resolve every entry against `origin`.
    ///
    /// The icon itself is resolved first so the manifest always carries an
    /// absolute icon URL.
    pub fn render(templates: &[String], version: &str, icon_url: &str, origin: &Url) -> Result<Self, Error> {
        let icon = resolve(icon_url, origin).map_err(|e| Error::InvalidUrl(format!("{icon_url}: {e}")))?;

        let urls = templates
            .iter()
            .map(|template| {
                let rendered = template.replace(VERSION_TOKEN, version).replace(ICON_TOKEN, icon.as_str());
                resolve(&rendered, origin).map_err(|e| Error::InvalidUrl(format!("{rendered}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { urls })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Self::render(&config.precache_urls, &config.sw_version, &config.icon_url, &origin)
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }
}

/// A manifest URL that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of an install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PrecacheReport {
    pub generation: String,
    pub stored: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

/// Fetches the manifest into the current generation.
pub struct PrecacheLoader {
    store: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    manifest: PrecacheManifest,
    generation: String,
}

impl PrecacheLoader {
    pub fn new(
        store: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>, manifest: PrecacheManifest,
        generation: impl Into<String>,
    ) -> Self {
        Self { store, transport, manifest, generation: generation.into() }
    }

    /// Open the current generation and store every manifest URL that fetches with a 200.
    ///
    /// Individual URLs that fail are logged and reported, never escalated, so
    /// one bad asset doesn't block installation.
    ///
    /// # Errors
    ///
    /// Returns an error only if the generation itself can't be opened.
    pub async fn install(&self) -> Result<PrecacheReport, Error> {
        self.store.open(&self.generation).await?;
        tracing::info!(generation = %self.generation, urls = self.manifest.urls.len(), "installing cache");

        let results = join_all(self.manifest.urls.iter().map(|url| self.precache_one(url))).await;

        let mut report = PrecacheReport { generation: self.generation.clone(), ..Default::default() };
        for (url, result) in self.manifest.urls.iter().zip(results) {
            match result {
                Ok(()) => report.stored.push(url.to_string()),
                Err(reason) => {
                    tracing::warn!(url = %url, reason = %reason, "cache install failed for manifest entry");
                    report.failed.push(PrecacheFailure { url: url.to_string(), reason });
                }
            }
        }

        tracing::info!(
            generation = %self.generation,
            stored = report.stored.len(),
            failed = report.failed.len(),
            "cache install finished"
        );
        Ok(report)
    }

    async fn precache_one(&self, url: &Url) -> Result<(), String> {
        let response = self
            .transport
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| e.to_string())?;

        if response.status != StatusCode::OK {
            return Err(format!("status {}", response.status.as_u16()));
        }

        let entry =
            CacheEntry { request_method: "GET".to_string(), request_url: url.to_string(), response: response.to_stored() };
        self.store.put(&self.generation, &entry).await.map_err(|e| e.to_string())
    }
}
