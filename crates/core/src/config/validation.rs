//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_absolute_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// Accept either a list of strings or one comma-separated string.
///
/// Environment variables can only carry the latter.
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Raw::Many(v) => v,
    })
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `fallback_path`, `admin_prefix` or any warm URL is not an absolute path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `cache_prefix` or `cache_version` is empty or has whitespace
    /// - `max_entries` is set to 0
    ///
    /// Returns `ConfigError::Missing` if `listen_addr` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "listen_addr".into(),
                hint: "Set STASH_LISTEN_ADDR, e.g. 127.0.0.1:8080".into(),
            });
        }

        if !is_absolute_path(&self.fallback_path) {
            return Err(invalid("fallback_path", "must be an absolute path"));
        }

        if let Some(bad) = self.warm_urls.iter().find(|p| !is_absolute_path(p)) {
            return Err(invalid("warm_urls", format!("{bad} is not an absolute path")));
        }

        if !is_absolute_path(&self.admin_prefix) || self.admin_prefix.len() < 2 || self.admin_prefix.ends_with('/') {
            return Err(invalid("admin_prefix", "must be an absolute path like /__stash"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(invalid(field, "must be non-empty without whitespace"));
            }
        }

        if self.max_entries == Some(0) {
            return Err(invalid("max_entries", "must be at least 1 when set"));
        }

        Ok(())
    }
}
