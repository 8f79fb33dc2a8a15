//! Application configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `ATRBOX__`-prefixed environment variables
//! (e.g. `ATRBOX__RISK__ACCOUNT_SIZE=25000`).

use crate::api::YAHOO_API_BASE;
use crate::models::{BarInterval, LookbackRange};
use crate::monitor::FetchPlan;
use crate::risk::RiskSettings;
use crate::strategy::StrategyConfig;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "atrbox.toml";
const ENV_PREFIX: &str = "ATRBOX";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategySection {
    pub atr_period: usize,
    pub opening_range_minutes: u32,
    pub intraday_interval: BarInterval,
    pub intraday_range: LookbackRange,
    pub daily_range: LookbackRange,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            atr_period: 14,
            opening_range_minutes: 15,
            intraday_interval: BarInterval::FiveMinutes,
            intraday_range: LookbackRange::FiveDays,
            daily_range: LookbackRange::OneMonth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YahooSection {
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl Default for YahooSection {
    fn default() -> Self {
        Self {
            base_url: YAHOO_API_BASE.to_string(),
            timeout_secs: 10,
            requests_per_minute: 30,
        }
    }
}

impl YahooSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub symbol: String,
    pub strategy: StrategySection,
    pub risk: RiskSettings,
    pub refresh_interval_secs: u64,
    pub yahoo: YahooSection,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            strategy: StrategySection::default(),
            risk: RiskSettings::default(),
            refresh_interval_secs: 60,
            yahoo: YahooSection::default(),
            log_filter: "atrbox=info".to_string(),
        }
    }
}

impl AppConfig {
    pub const REFRESH_RANGE_SECS: (u64, u64) = (30, 300);

    /// Load and validate configuration
    ///
    /// An explicit `path` must exist; without one, `atrbox.toml` is read if
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("symbol must not be empty");
        }

        let (min_refresh, max_refresh) = Self::REFRESH_RANGE_SECS;
        if !(min_refresh..=max_refresh).contains(&self.refresh_interval_secs) {
            bail!(
                "refresh interval {}s outside {}-{}s",
                self.refresh_interval_secs,
                min_refresh,
                max_refresh
            );
        }

        self.risk.check().map_err(|v| anyhow!("invalid risk settings: {}", v))?;
        self.strategy_config()?;

        if self.yahoo.timeout_secs == 0 {
            bail!("yahoo.timeout_secs must be > 0");
        }

        Ok(())
    }

    /// Numeric core parameters derived from the strategy section
    pub fn strategy_config(&self) -> Result<StrategyConfig> {
        StrategyConfig::from_opening_range(
            self.strategy.atr_period,
            self.strategy.opening_range_minutes,
            self.strategy.intraday_interval,
        )
        .map_err(|e| anyhow!("invalid strategy settings: {}", e))
    }

    pub fn fetch_plan(&self) -> FetchPlan {
        FetchPlan {
            daily_range: self.strategy.daily_range,
            intraday_range: self.strategy.intraday_range,
            intraday_interval: self.strategy.intraday_interval,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
