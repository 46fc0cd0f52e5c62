//! Configuration settings for the WattTime client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the API token.
pub const TOKEN_ENV_VAR: &str = "WATTTIME_API_TOKEN";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API configuration.
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from the default location, returning defaults if the file doesn't exist.
    pub fn load_or_default() -> crate::Result<Self> {
        Self::load(None)
    }

    /// Load configuration from file.
    ///
    /// The token in the file, if any, is overridden by `WATTTIME_API_TOKEN`.
    pub fn load(path: Option<PathBuf>) -> crate::Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV_VAR)
            && !token.trim().is_empty()
        {
            config.api.token = Some(token);
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::config(e.to_string()))
    }

    /// Save configuration to file.
    pub fn save(&self, path: Option<PathBuf>) -> crate::Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn default_path() -> PathBuf {
        super::config_dir()
            .map(|p| p.join("config.toml"))
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }
}

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// WattTime API base URL (without the endpoint path).
    pub base_url: String,
    /// API token. Usually supplied through `WATTTIME_API_TOKEN` instead.
    pub token: Option<String>,
    /// Scheme placed before the token in the `Authorization` header.
    ///
    /// Defaults to `Token`, which the v1 marginal endpoint expects. Set it to
    /// `Bearer` for deployments that take a bearer token instead.
    pub auth_scheme: String,
    /// Default market when none is given.
    pub default_market: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries for failed requests.
    pub max_retries: u32,
    /// Delay added per retry attempt, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Rate limit (requests per second).
    pub rate_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.watttime.org/api/v1".to_string(),
            token: None,
            auth_scheme: "Token".to_string(),
            default_market: "RT5M".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 500,
            rate_limit: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            base_url = "https://example.test/v1"
            max_retries = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://example.test/v1");
        assert_eq!(config.api.max_retries, 0);
        assert_eq!(config.api.auth_scheme, "Token");
        assert_eq!(config.api.token, None);
        assert_eq!(config.api.default_market, "RT5M");
        assert_eq!(config.api.rate_limit, 10);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[api\nbase_url = 3").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.timeout_secs = 5;
        config.api.rate_limit = 2;
        config.save(Some(path.clone())).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.api.timeout_secs, 5);
        assert_eq!(loaded.api.rate_limit, 2);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.api.base_url, ApiConfig::default().base_url);
    }
}
