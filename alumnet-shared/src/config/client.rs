use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use thiserror::Error;
use url::Url;

/// Default REST root of a locally running backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

const ENV_API_BASE_URL: &str = "ALUMNET_API_BASE_URL";
const ENV_TOKEN_PATH: &str = "ALUMNET_TOKEN_PATH";
const ENV_LOG_LEVEL: &str = "ALUMNET_LOG_LEVEL";

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported configuration format. Use 'yaml', 'json' or 'toml'.")]
    UnsupportedFormat,
    #[error("Invalid ALUMNET_API_BASE_URL value: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Settings for the AlumNet client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the REST API, including the `/api` prefix.
    pub api_base_url: Url,

    /// Where the bearer token is persisted. Platform config dir when unset.
    pub token_path: Option<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    ///
    /// # Panics
    /// Panics only if [`DEFAULT_API_BASE_URL`] stops being a valid URL.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API base URL is valid"),
            token_path: None,
            log_level: "warn".to_string(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Values from the file win; environment variables only fill in settings
    /// still at their default.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = Self::with_defaults();
        let mut config = defaults.clone();

        if let Some(path) = config_path {
            let content = fs::read_to_string(&path)?;
            config = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => serde_yml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some("toml") => toml::from_str(&content)?,
                _ => return Err(ConfigError::UnsupportedFormat),
            };
        }

        if config.api_base_url == defaults.api_base_url {
            if let Ok(raw) = env::var(ENV_API_BASE_URL) {
                config.api_base_url = Url::parse(&raw)?;
            }
        }
        if config.token_path.is_none() {
            if let Ok(path) = env::var(ENV_TOKEN_PATH) {
                config.token_path = Some(PathBuf::from(path));
            }
        }
        if config.log_level == defaults.log_level {
            if let Ok(level) = env::var(ENV_LOG_LEVEL) {
                config.log_level = level;
            }
        }

        tracing::debug!(api_base_url = %config.api_base_url, "configuration resolved");
        Ok(config)
    }

    /// Validate the configuration, collecting every problem.
    ///
    /// # Errors
    /// Returns the list of human-readable problems found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            errors.push(format!(
                "API base URL must use http or https: {}",
                self.api_base_url
            ));
        }
        if self.log_level.trim().is_empty() {
            errors.push("Log level must not be empty.".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
