//! progresstracker configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main progresstracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Progress API connection
    pub api: ApiConfig,

    /// Retry policy for API calls
    pub retry: RetryConfig,

    /// Read cache
    pub cache: CacheConfig,

    /// Signed-in user resolution
    pub auth: AuthConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        let base_url = reqwest::Url::parse(self.api.base_url.trim())
            .map_err(|e| eyre::eyre!("api.base-url '{}' is not a valid URL: {}", self.api.base_url, e))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(eyre::eyre!(
                "api.base-url must be an http:// or https:// URL with a host, got '{}'",
                self.api.base_url
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(eyre::eyre!("retry.max-attempts must be at least 1"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(eyre::eyre!("cache.ttl-secs must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .progresstracker.yml
        let local_config = PathBuf::from(".progresstracker.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/progresstracker/progresstracker.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: a broken config file is reported properly by
    /// `load` once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(".progresstracker.yml")), Self::user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("progresstracker").join("progresstracker.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Progress API connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL, without the `/progress` prefix
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Environment variable holding an optional bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: 30_000,
            token_env: "PROGRESS_API_TOKEN".to_string(),
        }
    }
}

impl ApiConfig {
    /// Bearer token from the environment, if set and non-empty
    pub fn get_token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Retry policy for API calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Read cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached read stays fresh, in seconds
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Signed-in user resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed user id; takes precedence over the environment
    #[serde(rename = "user-id")]
    pub user_id: Option<String>,

    /// Environment variable holding the user id
    #[serde(rename = "user-id-env")]
    pub user_id_env: String,

    /// Email of the user, for display only
    pub email: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            user_id_env: "PROGRESS_USER_ID".to_string(),
            email: None,
        }
    }
}
