use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::baseline::BaselineConfig;
use crate::efficiency::EfficiencyConfig;
use crate::error::ReadyRsError;
use crate::logging::LogConfig;
use crate::notify::NotifyConfig;
use crate::readiness::{EngineConfig, Horizons};
use crate::scoring::ScoringPolicy;
use crate::source::IntervalsClient;
use crate::trends::TrendConfig;
use crate::verdict::VerdictThresholds;
use crate::weekly::{WeeklyConfig, MAX_WEEKS};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Athlete identity and upstream API access
    pub athlete: AthleteConfig,

    /// Scoring policy and verdict thresholds
    pub scoring: ScoringConfig,

    /// Rolling windows and fetch spans
    pub horizons: Horizons,

    /// Week boundaries and baseline horizons
    pub weeks: BaselineConfig,

    /// Trend alert thresholds
    pub trends: TrendConfig,

    /// Weekly load review
    pub weekly: WeeklyConfig,

    /// Rolling ride efficiency periods
    pub efficiency: EfficiencyConfig,

    /// Response cache
    pub cache: CacheConfig,

    /// Notification delivery
    pub notify: NotifyConfig,

    /// Logging
    pub logging: LogConfig,
}

/// Athlete identity and upstream API access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteConfig {
    /// Upstream athlete id, e.g. `i12345`
    pub athlete_id: String,

    /// Upstream API key
    pub api_key: Option<String>,

    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AthleteConfig {
    fn default() -> Self {
        AthleteConfig {
            athlete_id: String::new(),
            api_key: None,
            base_url: IntervalsClient::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Scoring policy with optional threshold overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub policy: ScoringPolicy,

    /// Minimum score for GREEN (policy default when unset)
    pub green: Option<u8>,

    /// Minimum score for YELLOW (policy default when unset)
    pub yellow: Option<u8>,
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

/// Environment variables overriding file settings
pub const ENV_API_KEY: &str = "READYRS_API_KEY";
pub const ENV_ATHLETE_ID: &str = "READYRS_ATHLETE_ID";
pub const ENV_TELEGRAM_TOKEN: &str = "READYRS_TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "READYRS_TELEGRAM_CHAT_ID";

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readyrs")
            .join("config.toml")
    }

    /// Load the given file, or the default path, falling back to defaults
    /// when the default file does not exist. An explicit path must load.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let config_path = Self::default_config_path();
                if config_path.exists() {
                    Self::load_from_file(&config_path)
                } else {
                    tracing::debug!("Config file not found, using defaults: {}", config_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Override secrets and identity from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override secrets and identity through a lookup function
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.athlete.api_key = Some(key);
        }
        if let Some(id) = lookup(ENV_ATHLETE_ID) {
            self.athlete.athlete_id = id;
        }
        if let Some(token) = lookup(ENV_TELEGRAM_TOKEN) {
            self.notify.telegram_token = Some(token);
        }
        if let Some(chat) = lookup(ENV_TELEGRAM_CHAT_ID) {
            self.notify.telegram_chat_id = Some(chat);
        }
    }

    /// Verdict thresholds: policy defaults with per-field overrides
    pub fn thresholds(&self) -> crate::Result<VerdictThresholds> {
        let defaults = VerdictThresholds::for_policy(self.scoring.policy);
        VerdictThresholds::new(
            self.scoring.green.unwrap_or(defaults.green),
            self.scoring.yellow.unwrap_or(defaults.yellow),
        )
    }

    /// Engine configuration assembled from the file sections
    pub fn engine_config(&self) -> crate::Result<EngineConfig> {
        Ok(EngineConfig {
            policy: self.scoring.policy,
            thresholds: self.thresholds()?,
            horizons: self.horizons.clone(),
            baseline: self.weeks.clone(),
            trends: self.trends.clone(),
        })
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> crate::Result<()> {
        self.thresholds()?;

        let invalid = |msg: &str| Err(ReadyRsError::Configuration(msg.to_string()));

        if self.horizons.trailing_samples == 0 || self.horizons.distribution_samples == 0 {
            return invalid("horizons must hold at least one sample");
        }
        if self.horizons.recent_days == 0 || self.horizons.history_days == 0 {
            return invalid("fetch spans must cover at least one day");
        }
        if self.weeks.history_weeks == 0 {
            return invalid("weeks.history_weeks must be at least 1");
        }
        if self.weeks.chronic_weeks > self.weeks.history_weeks
            || self.weeks.historic_weeks > self.weeks.history_weeks
        {
            return invalid("baseline horizons cannot exceed weeks.history_weeks");
        }
        if self.weekly.weeks == 0 || self.weekly.weeks > MAX_WEEKS {
            return invalid("weekly.weeks must be between 1 and 52");
        }
        if self.weekly.productive_ratio > self.weekly.very_high_ratio {
            return invalid("weekly.productive_ratio cannot exceed weekly.very_high_ratio");
        }
        if self.efficiency.periods.is_empty()
            || self.efficiency.periods.iter().any(|p| *p == 0 || *p > 366)
        {
            return invalid("efficiency.periods must list periods of 1 to 366 days");
        }
        Ok(())
    }

    /// Athlete id, required for any upstream request
    pub fn athlete_id(&self) -> crate::Result<&str> {
        if self.athlete.athlete_id.trim().is_empty() {
            return Err(ReadyRsError::Configuration(format!(
                "an athlete id is required (set athlete.athlete_id or {})",
                ENV_ATHLETE_ID
            )));
        }
        Ok(&self.athlete.athlete_id)
    }
}
