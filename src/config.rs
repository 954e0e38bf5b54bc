use anyhow::{Context, Result};

/// Which [`crate::store::KeyValueStore`] implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when generating short links, e.g. "https://go.example.com".
    /// When unset, short links are built from the request's `Host` header.
    /// Never has a trailing slash.
    pub base_url: Option<String>,

    /// Store backend, selected with STORE_BACKEND ("memory" or "redis").
    pub store_backend: StoreBackend,

    /// Redis connection string, only used by the redis backend.
    pub redis_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            base_url: None,
            store_backend: StoreBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .context("PORT must be a valid port number (1–65535)")?,
            None => defaults.port,
        };

        let base_url = var("BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty());

        let store_backend = match var("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreBackend::Memory,
            Some("redis") => StoreBackend::Redis,
            Some(other) => {
                anyhow::bail!("STORE_BACKEND must be \"memory\" or \"redis\", got \"{other}\"")
            }
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            base_url,
            store_backend,
            redis_url: var("REDIS_URL").unwrap_or(defaults.redis_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, None);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("BASE_URL", "https://go.example.com/"),
            ("STORE_BACKEND", "redis"),
            ("REDIS_URL", "redis://cache:6379/2"),
        ])
        .unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url.as_deref(), Some("https://go.example.com"));
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(config.redis_url, "redis://cache:6379/2");
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("PORT", "70000")]).is_err());
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("STORE_BACKEND", "sqlite")]).is_err());
    }
}
