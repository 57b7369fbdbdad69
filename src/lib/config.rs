use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::adapters::HttpServerConfig;
use crate::imaging::{FalConfig, DEFAULT_MODEL, DEFAULT_QUEUE_URL};
use crate::transport::TlsConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),
    #[error("Environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub server: HttpServerConfig,
    pub fal: FalConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("FAL_KEY").ok_or(ConfigError::Missing("FAL_KEY"))?;
        let poll_interval = match var("FAL_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid { name: "FAL_POLL_INTERVAL_MS", reason: e.to_string() }
            })?),
            None => Duration::from_millis(500),
        };
        let fal = FalConfig {
            api_key,
            model: var("FAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            queue_url: var("FAL_QUEUE_URL").unwrap_or_else(|| DEFAULT_QUEUE_URL.to_string()),
            poll_interval,
        };

        let tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig { cert_path: PathBuf::from(cert), key_path: PathBuf::from(key) }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("TLS_KEY_PATH")),
            (None, Some(_)) => return Err(ConfigError::Missing("TLS_CERT_PATH")),
        };
        let server = HttpServerConfig {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| HttpServerConfig::default().bind_addr),
            tls,
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite://todos.db".to_string()),
            server,
            fal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_fal_key_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite://x.db")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("FAL_KEY"));
        let err = AppConfig::from_lookup(lookup(&[("FAL_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("FAL_KEY"));
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[("FAL_KEY", "secret")])).unwrap();
        assert_eq!(config.database_url, "sqlite://todos.db");
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.server.tls, None);
        assert_eq!(config.fal.api_key, "secret");
        assert_eq!(config.fal.model, "fal-ai/flux/dev");
        assert_eq!(config.fal.queue_url, "https://queue.fal.run");
        assert_eq!(config.fal.poll_interval, Duration::from_millis(500));
        assert!(!format!("{:?}", config.fal).contains("secret"));
    }

    #[test]
    fn overrides_and_tls_pairing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FAL_KEY", "secret"),
            ("FAL_MODEL", "fal-ai/flux/schnell"),
            ("FAL_POLL_INTERVAL_MS", "50"),
            ("BIND_ADDR", "127.0.0.1:8443"),
            ("TLS_CERT_PATH", "cert.pem"),
            ("TLS_KEY_PATH", "key.pem"),
        ]))
        .unwrap();
        assert_eq!(config.fal.model, "fal-ai/flux/schnell");
        assert_eq!(config.fal.poll_interval, Duration::from_millis(50));
        assert_eq!(config.server.bind_addr, "127.0.0.1:8443");
        assert_eq!(config.server.tls.unwrap().key_path, PathBuf::from("key.pem"));

        let err = AppConfig::from_lookup(lookup(&[("FAL_KEY", "k"), ("TLS_CERT_PATH", "cert.pem")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TLS_KEY_PATH"));

        let err = AppConfig::from_lookup(lookup(&[("FAL_KEY", "k"), ("FAL_POLL_INTERVAL_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FAL_POLL_INTERVAL_MS", .. }));
    }
}
