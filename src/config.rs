use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::AppError;
use crate::finnhub::normalize_symbol;
use crate::finnhub::rest::DEFAULT_TIMEOUT;
use crate::scheduler::{RefreshSettings, DEFAULT_PACING, DEFAULT_REFRESH_INTERVAL};
use crate::snapshot::SnapshotPaths;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "MARKET_PULSE_CONFIG";
pub const TOKEN_ENV: &str = "FINNHUB_API_KEY";

pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "AMD",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_stocks_path")]
    pub stocks_path: PathBuf,
    #[serde(default = "default_best_path")]
    pub best_path: PathBuf,
    #[serde(default = "default_trending_path")]
    pub trending_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_base_url() -> String {
    "https://finnhub.io/api/v1/quote".to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_pacing_ms() -> u64 {
    DEFAULT_PACING.as_millis() as u64
}
fn default_stocks_path() -> PathBuf {
    SnapshotPaths::default().stocks
}
fn default_best_path() -> PathBuf {
    SnapshotPaths::default().best
}
fn default_trending_path() -> PathBuf {
    SnapshotPaths::default().trending
}
fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_level() -> String {
    "info".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            interval_secs: default_interval_secs(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stocks_path: default_stocks_path(),
            best_path: default_best_path(),
            trending_path: default_trending_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl RefreshConfig {
    /// Configured symbols normalized, deduplicated and in order. Blank entries
    /// are dropped; an empty list falls back to [`DEFAULT_SYMBOLS`].
    pub fn watchlist(&self) -> Result<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for raw in &self.symbols {
            if raw.trim().is_empty() {
                continue;
            }
            let sym = normalize_symbol(raw)
                .map_err(|e| AppError::Config(format!("refresh.symbols: {}", e)))?;
            if !out.contains(&sym) {
                out.push(sym);
            }
        }
        if out.is_empty() {
            out = DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect();
        }
        Ok(out)
    }

    pub fn settings(&self) -> RefreshSettings {
        RefreshSettings {
            interval: Duration::from_secs(self.interval_secs),
            pacing: Duration::from_millis(self.pacing_ms),
        }
    }
}

impl OutputConfig {
    pub fn snapshot_paths(&self) -> SnapshotPaths {
        SnapshotPaths {
            stocks: self.stocks_path.clone(),
            best: self.best_path.clone(),
            trending: self.trending_path.clone(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("server.bind '{}' is not a socket address", self.bind))
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_path(&config_path)?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.upstream.token = token.trim().to_string();
            }
        }
        if config.upstream.token.trim().is_empty() {
            return Err(AppError::Config(format!(
                "{} not set in .env or environment, and upstream.token is empty",
                TOKEN_ENV
            ))
            .into());
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parses and validates. The token is not required here; [`Config::load`]
    /// enforces it after the environment override.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.upstream.base_url).with_context(|| {
            format!("upstream.base_url '{}' is not a URL", self.upstream.base_url)
        })?;
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::Config("upstream.timeout_secs must be > 0".to_string()).into());
        }
        if self.refresh.interval_secs == 0 {
            return Err(AppError::Config("refresh.interval_secs must be > 0".to_string()).into());
        }
        self.refresh.watchlist()?;
        if self.server.enabled {
            self.server.bind_addr()?;
        }
        Ok(())
    }
}
