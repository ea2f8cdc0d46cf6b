use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::duration::{
    deserialize_duration, deserialize_duration_opt, deserialize_time_of_day,
    serialize_duration, serialize_duration_opt, serialize_time_of_day,
};
use crate::portfolio::DEFAULT_SNAPSHOT_TIME;
use crate::valuation::MissingPricePolicy;

pub const DEFAULT_CONFIG_FILE: &str = "coinboard.toml";

fn default_holdings_file() -> PathBuf {
    PathBuf::from("portfolio.csv")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("history.json")
}

fn default_base_url() -> String {
    "https://www.okx.com".to_string()
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_snapshot_time() -> NaiveTime {
    DEFAULT_SNAPSHOT_TIME
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

/// Exchange used as the price source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Okx,
}

/// Price source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSourceConfig {
    pub exchange: Exchange,

    /// REST root of the exchange API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Quote asset of every trading pair. Holdings of this asset are valued
    /// at exactly 1.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    /// Optional per-request timeout. Unset means requests may block for as
    /// long as the exchange takes.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt"
    )]
    pub timeout: Option<Duration>,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            exchange: Exchange::default(),
            base_url: default_base_url(),
            quote_asset: default_quote_asset(),
            timeout: None,
        }
    }
}

/// Valuation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// What to do with a holding whose pair is absent from the fetched
    /// prices. `zero` keeps it with price 0; `skip` leaves it out.
    pub missing_price: MissingPricePolicy,
}

/// Daily snapshot schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local time of day at which the scheduled snapshot is taken (`HH:MM`).
    #[serde(
        default = "default_snapshot_time",
        deserialize_with = "deserialize_time_of_day",
        serialize_with = "serialize_time_of_day"
    )]
    pub snapshot_time: NaiveTime,

    /// How often the scheduler checks whether the snapshot is due.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub poll_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            snapshot_time: default_snapshot_time(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Application configuration as written in `coinboard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Holdings CSV, relative to the data directory.
    #[serde(default = "default_holdings_file")]
    pub holdings_file: PathBuf,

    /// History JSON array, relative to the data directory.
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    pub price_source: PriceSourceConfig,
    pub valuation: ValuationConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            holdings_file: default_holdings_file(),
            history_file: default_history_file(),
            price_source: PriceSourceConfig::default(),
            valuation: ValuationConfig::default(),
            schedule: ScheduleConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        let data_dir = self.resolve_data_dir(config_dir);
        ResolvedConfig {
            holdings_path: data_dir.join(&self.holdings_file),
            history_path: data_dir.join(&self.history_file),
            data_dir,
            price_source: self.price_source,
            valuation: self.valuation,
            schedule: self.schedule,
            server: self.server,
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub holdings_path: PathBuf,
    pub history_path: PathBuf,
    pub price_source: PriceSourceConfig,
    pub valuation: ValuationConfig,
    pub schedule: ScheduleConfig,
    pub server: ServerConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./coinboard.toml` if it exists in current directory
/// 2. `~/.local/share/coinboard/coinboard.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("coinboard").join(DEFAULT_CONFIG_FILE);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Relative paths are resolved against the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Ok(Config::load(&config_path)?.resolve(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the directory the config would live in becomes the
    /// data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().resolve(config_dir))
    }
}
