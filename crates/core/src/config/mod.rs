//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASH_*)
//! 2. TOML config file (if STASH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STASH_*)
/// 2. TOML config file (if STASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the application being fronted.
    ///
    /// Set via STASH_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the proxy listens on.
    ///
    /// Set via STASH_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via STASH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Prefix shared by every cache this deployment owns.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version. Bumping it retires every cache of the old version
    /// on the next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Absolute path of the document served when a navigation fails.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,

    /// Absolute paths fetched and stored at install time.
    ///
    /// Set via STASH_WARM_URLS (comma-separated) or a TOML array.
    #[serde(default = "default_warm_urls", deserialize_with = "validation::string_or_list")]
    pub warm_urls: Vec<String>,

    /// Path prefix of the JSON admin endpoints.
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,

    /// Optional cap on runtime cache entries, enforced after activation.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stash-cache.sqlite")
}

fn default_user_agent() -> String {
    "stash/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_prefix() -> String {
    "stash".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_fallback_path() -> String {
    "/offline".into()
}

fn default_warm_urls() -> Vec<String> {
    [
        "/static/css/main.css",
        "/status/wishlist",
        "/status/backlog",
        "/status/to-read",
        "/status/reading",
        "/status/finished",
        "/status/dnf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_admin_prefix() -> String {
    "/__stash".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            fallback_path: default_fallback_path(),
            warm_urls: default_warm_urls(),
            admin_prefix: default_admin_prefix(),
            max_entries: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL. Only valid after [`AppConfig::validate`] passed.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        crate::url::canonicalize(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Name of the cache shared by runtime routes and cache warming.
    pub fn runtime_cache(&self) -> String {
        format!("{}-runtime-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the cache holding install-time precached documents.
    pub fn precache_cache(&self) -> String {
        format!("{}-precache-{}", self.cache_prefix, self.cache_version)
    }

    /// Every cache name the current deployment owns.
    pub fn current_caches(&self) -> Vec<String> {
        vec![self.runtime_cache(), self.precache_cache()]
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STASH_`
    /// 2. TOML file from `STASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("STASH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://127.0.0.1:8000");
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.db_path, PathBuf::from("./stash-cache.sqlite"));
        assert_eq!(config.user_agent, "stash/0.1");
        assert_eq!(config.max_bytes, 10_485_760);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.fallback_path, "/offline");
        assert_eq!(config.warm_urls.len(), 7);
        assert_eq!(config.warm_urls[0], "/static/css/main.css");
        assert!(config.warm_urls.contains(&"/status/reading".to_string()));
        assert!(config.max_entries.is_none());
    }

    #[test]
    fn test_cache_names() {
        let config = AppConfig { cache_version: "v7".into(), ..Default::default() };
        assert_eq!(config.runtime_cache(), "stash-runtime-v7");
        assert_eq!(config.precache_cache(), "stash-precache-v7");
        assert_eq!(config.current_caches(), vec!["stash-runtime-v7".to_string(), "stash-precache-v7".to_string()]);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STASH_ORIGIN", "https://books.example.com");
            jail.set_env("STASH_CACHE_VERSION", "v2");
            jail.set_env("STASH_WARM_URLS", "/status/reading,/status/finished");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "https://books.example.com");
            assert_eq!(config.runtime_cache(), "stash-runtime-v2");
            assert_eq!(config.warm_urls, vec!["/status/reading".to_string(), "/status/finished".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "stash.toml",
                r#"
                origin = "http://localhost:9000"
                fallback_path = "/offline/"
                warm_urls = ["/static/css/main.css"]
                max_entries = 500
                "#,
            )?;
            jail.set_env("STASH_CONFIG_FILE", "stash.toml");
            jail.set_env("STASH_TIMEOUT_MS", "5000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "http://localhost:9000");
            assert_eq!(config.fallback_path, "/offline/");
            assert_eq!(config.warm_urls, vec!["/static/css/main.css".to_string()]);
            assert_eq!(config.max_entries, Some(500));
            assert_eq!(config.timeout_ms, 5000);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STASH_FALLBACK_PATH", "offline");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
