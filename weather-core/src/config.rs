use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    error::IdentityError,
    forecast::{DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS, openmeteo::DEFAULT_FORECAST_URL},
    http::RetryPolicy,
    identity::IdentityCipher,
    locale::Locale,
    resolver::wikipedia::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the stored encryption key.
pub const ENCRYPTION_KEY_ENV: &str = "CITYWEATHER_ENCRYPTION_KEY";

fn default_wiki_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_forecast_url() -> String {
    DEFAULT_FORECAST_URL.to_string()
}

fn default_forecast_days() -> u32 {
    DEFAULT_FORECAST_DAYS
}

fn default_cache_ttl_secs() -> u64 {
    60 * 60
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// locale = "ru"
/// encryption_key = "..."
/// forecast_days = 7
///
/// [retry]
/// max_retries = 5
/// backoff_factor_secs = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub locale: Locale,

    /// Fernet key for the user id cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,

    #[serde(default = "default_wiki_base_url")]
    pub wiki_base_url: String,

    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            encryption_key: None,
            wiki_base_url: default_wiki_base_url(),
            forecast_url: default_forecast_url(),
            forecast_days: default_forecast_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "cityweather", "cityweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for the history database and the cookie jar.
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Applies overrides from the given lookup (normally `std::env::var`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENCRYPTION_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.encryption_key = Some(key);
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Requested forecast length, kept inside what the provider serves.
    pub fn forecast_days(&self) -> u32 {
        self.forecast_days.clamp(1, MAX_FORECAST_DAYS)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn identity_cipher(&self) -> Result<IdentityCipher, IdentityError> {
        let key = self.encryption_key.as_deref().ok_or(IdentityError::MissingKey)?;
        IdentityCipher::new(key)
    }

    pub fn set_encryption_key(&mut self, key: String) {
        self.encryption_key = Some(key);
    }
}
