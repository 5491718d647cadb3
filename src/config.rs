use std::env;
use std::time::Duration;

use tracing::info;
use url::Url;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Runtime settings for the watcher, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("NOTIFY_API_BASE_URL").ok_or(ConfigError::Missing("NOTIFY_API_BASE_URL"))?;
        let api_base_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            key: "NOTIFY_API_BASE_URL",
            reason: e.to_string(),
        })?;

        let api_token = lookup("NOTIFY_API_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if api_token.is_none() {
            info!("NOTIFY_API_TOKEN not set, requests will be unauthenticated");
        }

        Ok(Self {
            api_base_url,
            api_token,
            poll_interval_secs: seconds(&lookup, "NOTIFY_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            request_timeout_secs: seconds(&lookup, "NOTIFY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        info!("{} not set, using default: {}", key, default);
        return Ok(default);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("NOTIFY_API_BASE_URL", "https://pets.example.com/api")]).unwrap();

        assert_eq!(config.api_base_url.as_str(), "https://pets.example.com/api");
        assert!(config.api_token.is_none());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("NOTIFY_API_BASE_URL", "http://localhost:8080"),
            ("NOTIFY_API_TOKEN", " abc123 "),
            ("NOTIFY_POLL_INTERVAL_SECS", "5"),
            ("NOTIFY_REQUEST_TIMEOUT_SECS", "2"),
        ])
        .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("abc123"));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.request_timeout_secs, 2);
    }

    #[test]
    fn test_blank_token_is_none() {
        let config = load(&[
            ("NOTIFY_API_BASE_URL", "http://localhost:8080"),
            ("NOTIFY_API_TOKEN", "   "),
        ])
        .unwrap();
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_missing_base_url() {
        match load(&[]) {
            Err(ConfigError::Missing(key)) => assert_eq!(key, "NOTIFY_API_BASE_URL"),
            other => panic!("Expected Missing error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("NOTIFY_API_BASE_URL", "not a url")]),
            Err(ConfigError::Invalid { key: "NOTIFY_API_BASE_URL", .. })
        ));
        assert!(matches!(
            load(&[
                ("NOTIFY_API_BASE_URL", "http://localhost"),
                ("NOTIFY_POLL_INTERVAL_SECS", "0"),
            ]),
            Err(ConfigError::Invalid { key: "NOTIFY_POLL_INTERVAL_SECS", .. })
        ));
        assert!(matches!(
            load(&[
                ("NOTIFY_API_BASE_URL", "http://localhost"),
                ("NOTIFY_REQUEST_TIMEOUT_SECS", "soon"),
            ]),
            Err(ConfigError::Invalid { key: "NOTIFY_REQUEST_TIMEOUT_SECS", .. })
        ));
    }
}
