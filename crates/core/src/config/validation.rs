//! Configuration validation rules.
//!
//! Checks applied to `AppConfig` after it has been loaded from environment,
//! files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - a name, marker, tag, or manifest entry is empty
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_redirects` exceeds 20
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        require_non_empty("cache_prefix", &self.cache_prefix)?;
        require_non_empty("sw_version", &self.sw_version)?;
        require_non_empty("icon_url", &self.icon_url)?;
        require_non_empty("notification_tag", &self.notification_tag)?;
        require_non_empty("volatile_marker", &self.volatile_marker)?;
        require_non_empty("user_agent", &self.user_agent)?;

        if self.precache_urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "precache_urls".into(),
                reason: "entries must not be empty".into(),
            });
        }

        if self.document_fetch_markers.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "document_fetch_markers".into(),
                reason: "entries must not be empty".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.precache_urls.is_empty() {
            tracing::warn!("precache_urls is empty; install will not cache an offline shell");
        }

        Ok(())
    }
}
