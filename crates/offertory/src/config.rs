//! Configuration management for offertory.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Local};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::DEFAULT_SLOT_KEY;
use crate::receipt::ReceiptFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "offertory";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Environment variable prefix; nested keys are separated by `__`.
const ENV_PREFIX: &str = "OFFERTORY_";

/// Credential variables consulted when no key is configured.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `OFFERTORY_`, `__` between levels)
/// 2. TOML config file at `~/.config/offertory/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// The organization issuing receipts.
    pub church: ChurchInfo,
    /// Receipt output configuration.
    pub receipt: ReceiptConfig,
    /// Text-generation service configuration.
    pub insight: InsightConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/offertory/ledger.db`
    pub database_path: Option<PathBuf>,
    /// Slot the donation list is stored under.
    pub slot_key: String,
}

/// The organization that issues receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurchInfo {
    /// Legal name, printed as the receipt title.
    pub name: String,
    /// Tax identification number.
    pub tax_id: String,
    /// Postal address.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// Person responsible for issuing receipts.
    pub handler: String,
}

/// Receipt output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Directory receipts are written to.
    /// Defaults to the current directory.
    pub output_dir: Option<PathBuf>,
    /// Receipt year; the current year when unset.
    pub year: Option<i32>,
    /// Output format.
    pub format: ReceiptFormat,
}

/// Text-generation service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Base URL of the generative language API.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// API key. Falls back to `GEMINI_API_KEY`, then `API_KEY`.
    /// Never serialized, so `config show --json` cannot leak it.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }
}

impl Default for ChurchInfo {
    fn default() -> Self {
        Self {
            name: "財團法人台中市基督教富足基金會".to_string(),
            tax_id: "87063184".to_string(),
            address: "台中市大里區大明路 395-10 號".to_string(),
            phone: "（04）2482-3627".to_string(),
            handler: "黃美珠".to_string(),
        }
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            year: None,
            format: ReceiptFormat::Text,
        }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-pro-preview".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.slot_key.trim().is_empty() {
            return Err(Error::config_validation("storage.slot_key must not be empty"));
        }

        if self.church.name.trim().is_empty() {
            return Err(Error::config_validation("church.name must not be empty"));
        }

        if let Some(year) = self.receipt.year {
            if !(1900..=9999).contains(&year) {
                return Err(Error::config_validation(format!(
                    "receipt.year ({year}) must be between 1900 and 9999"
                )));
            }
        }

        let endpoint = &self.insight.endpoint;
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(Error::config_validation(format!(
                "insight.endpoint must be an http(s) URL, got {endpoint:?}"
            )));
        }

        if self.insight.model.trim().is_empty() {
            return Err(Error::config_validation("insight.model must not be empty"));
        }

        if self.insight.timeout_secs == 0 {
            return Err(Error::config_validation(
                "insight.timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the receipt output directory, defaulting to the current directory.
    #[must_use]
    pub fn receipt_dir(&self) -> PathBuf {
        self.receipt
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the receipt year: the configured year, else the newest year
    /// with donations, else the current calendar year.
    #[must_use]
    pub fn receipt_year(&self, latest: Option<i32>) -> i32 {
        self.receipt
            .year
            .or(latest)
            .unwrap_or_else(|| Local::now().year())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn insight_timeout(&self) -> Duration {
        Duration::from_secs(self.insight.timeout_secs)
    }

    /// Resolve the API key from config or the credential environment variables.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.insight
            .api_key
            .clone()
            .or_else(|| {
                API_KEY_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
            })
            .filter(|key| !key.trim().is_empty())
    }
}
