//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a partial file (or no file at all, via
//! [`AppConfig::load_or_default`]) still yields a working service.
//! Secrets (the advisory API key) are referenced by env-var name and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::scoring::ScoringConfig;
use crate::types::PredictorError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub advisory: AdvisoryConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Freshness window for the fetched history.
    pub cache_ttl_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            url: "https://sunwinsaygex-8616.onrender.com/api/taixiu/history".to_string(),
            timeout_secs: 10,
            cache_ttl_ms: 60_000,
        }
    }
}

impl HistoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    pub url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl AdvisoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window for computed predictions.
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_ms: 60_000 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub warm_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warm_interval_secs: 300,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.warm_interval_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), PredictorError> {
        let w = &self.scoring.weights;
        let weights = [w.trend, w.sequence, w.statistics, w.probability, w.ratio];
        if weights.iter().any(|x| !x.is_finite() || *x < 0.0) || w.total() <= 0.0 {
            return Err(PredictorError::Config(
                "scoring weights must be non-negative with a positive sum".to_string(),
            ));
        }
        if self.scoring.low_mean_threshold > self.scoring.high_mean_threshold {
            return Err(PredictorError::Config(format!(
                "low_mean_threshold ({}) exceeds high_mean_threshold ({})",
                self.scoring.low_mean_threshold, self.scoring.high_mean_threshold
            )));
        }
        if self.scheduler.enabled && self.scheduler.warm_interval_secs == 0 {
            return Err(PredictorError::Config(
                "scheduler.warm_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!(path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply environment overrides (`PORT`).
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
