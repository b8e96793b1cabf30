//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Environment variables (SHELLCACHE_*)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Manifest token replaced by [`AppConfig::sw_version`].
pub const VERSION_TOKEN: &str = "{{ sw_version }}";

/// Manifest token replaced by the absolute icon URL.
pub const ICON_TOKEN: &str = "{{ icon_url }}";

/// Marker for the "get document" API call.
pub const GETDOC_MARKER: &str = "/api/method/frappe.desk.form.load.getdoc?doctype";

/// Marker for the "get doctype" API call.
pub const GETDOCTYPE_MARKER: &str = "api/method/frappe.desk.form.load.getdoctype?doctype";

/// Start of the cache-busting parameter appended to document fetches.
pub const CACHED_TIMESTAMP_MARKER: &str = "&cached_timestamp=";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application the proxy serves (scheme, host, port).
    ///
    /// Relative URLs resolve against it and only responses from it are cached.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of every generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployed version; the current generation is `cache_prefix + sw_version`.
    #[serde(default = "default_sw_version")]
    pub sw_version: String,

    /// Icon used by the manifest and push notifications.
    #[serde(default = "default_icon_url")]
    pub icon_url: String,

    /// Shell URLs to precache on install. May contain the version and icon tokens.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Tag shared by all push notifications so a new one replaces the last.
    #[serde(default = "default_notification_tag")]
    pub notification_tag: String,

    /// URL substrings identifying document-fetch API calls.
    #[serde(default = "default_document_fetch_markers")]
    pub document_fetch_markers: Vec<String>,

    /// Query fragment where the cache-busting parameter of a document fetch starts.
    #[serde(default = "default_volatile_marker")]
    pub volatile_marker: String,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body bytes accepted from upstream.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Redirects followed for requests with the `follow` policy.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_cache_prefix() -> String {
    "frappe-cache-v".into()
}

fn default_sw_version() -> String {
    "1".into()
}

fn default_icon_url() -> String {
    "/assets/frappe/images/frappe-framework-logo.png".into()
}

fn default_precache_urls() -> Vec<String> {
    [
        "/",
        "/manifest.json",
        ICON_TOKEN,
        "/assets/frappe/css/bootstrap.css",
        "/assets/frappe/css/fonts/fontawesome/font-awesome.min.css",
        "/assets/frappe/js/lib/jquery/jquery.min.js",
        "/assets/frappe_pwa/css/pwa-alerts.css",
        "/pwa.js",
        "/sw.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_notification_tag() -> String {
    "push-frappe-notification".into()
}

fn default_document_fetch_markers() -> Vec<String> {
    vec![GETDOC_MARKER.into(), GETDOCTYPE_MARKER.into()]
}

fn default_volatile_marker() -> String {
    CACHED_TIMESTAMP_MARKER.into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            sw_version: default_sw_version(),
            icon_url: default_icon_url(),
            precache_urls: default_precache_urls(),
            notification_tag: default_notification_tag(),
            document_fetch_markers: default_document_fetch_markers(),
            volatile_marker: default_volatile_marker(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the generation this deployment reads and writes.
    pub fn current_generation(&self) -> String {
        format!("{}{}", self.cache_prefix, self.sw_version)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" if parsed.has_host() => Ok(parsed),
            _ => Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL with a host".into() }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SHELLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./shellcache.sqlite"));
        assert_eq!(config.origin, "http://localhost:8000");
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.notification_tag, "push-frappe-notification");
        assert_eq!(config.volatile_marker, "&cached_timestamp=");
        assert_eq!(config.document_fetch_markers.len(), 2);
        assert!(config.precache_urls.contains(&"/".to_string()));
        assert!(config.precache_urls.contains(&"/sw.js".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_current_generation() {
        let config = AppConfig { sw_version: "42".into(), ..Default::default() };
        assert_eq!(config.current_generation(), "frappe-cache-v42");
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig { origin: "https://erp.example.com".into(), ..Default::default() };
        assert_eq!(config.origin_url().unwrap().host_str(), Some("erp.example.com"));
    }

    #[test]
    fn test_origin_url_rejects_non_http() {
        let config = AppConfig { origin: "file:///tmp".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_layered_loading() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shellcache.toml",
                r#"
                sw_version = "7"
                origin = "https://erp.example.com"
                "#,
            )?;
            jail.set_env("SHELLCACHE_CONFIG_FILE", "shellcache.toml");
            jail.set_env("SHELLCACHE_CACHE_PREFIX", "erp-cache-v");

            let config = AppConfig::load().expect("config loads");
            assert_eq!(config.origin, "https://erp.example.com");
            assert_eq!(config.sw_version, "7");
            assert_eq!(config.current_generation(), "erp-cache-v7");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELLCACHE_TIMEOUT_MS", "10");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
