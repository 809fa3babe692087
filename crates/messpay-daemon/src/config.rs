//! Configuration file management.
//!
//! `config.toml` lives in the data directory. Every field has a default, so
//! a missing file or a partial file is fine.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use messpay_ledger::SettlementSettings;

use messpay_settlement::commission::DEFAULT_COMMISSION_PERCENT;
use messpay_settlement::cycle::offset_from_minutes;
use messpay_settlement::{CommissionRate, EligibleStatuses};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "MESSPAY_DATA_DIR";
/// Environment variable overriding `settlement.commission_rate` (percent).
pub const COMMISSION_RATE_ENV: &str = "MESSPAY_COMMISSION_RATE";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Settlement policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Percent of gross revenue kept as platform fee.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// Count cash-on-delivery orders not yet collected.
    #[serde(default = "default_true")]
    pub include_cash_pending: bool,
    /// Business reporting timezone as a UTC offset. 330 = Asia/Kolkata.
    #[serde(default = "default_utc_offset")]
    pub reporting_utc_offset_minutes: i32,
    /// Regenerate the current cycle's report every N seconds. 0 = off.
    #[serde(default)]
    pub precompute_interval_secs: u64,
}

/// Dashboard defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_top_limit")]
    pub top_default_limit: usize,
    #[serde(default = "default_top_max")]
    pub top_max_limit: usize,
    #[serde(default = "default_since_days")]
    pub top_default_since_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_commission_rate() -> f64 {
    DEFAULT_COMMISSION_PERCENT
}

fn default_true() -> bool {
    true
}

fn default_utc_offset() -> i32 {
    330
}

fn default_top_limit() -> usize {
    5
}

fn default_top_max() -> usize {
    20
}

fn default_since_days() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            commission_rate: default_commission_rate(),
            include_cash_pending: true,
            reporting_utc_offset_minutes: default_utc_offset(),
            precompute_interval_secs: 0,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_default_limit: default_top_limit(),
            top_max_limit: default_top_max(),
            top_default_since_days: default_since_days(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location, then
    /// apply environment overrides.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_rate_override(std::env::var(COMMISSION_RATE_ENV).ok().as_deref())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("parsing config.toml")
    }

    /// Apply a `MESSPAY_COMMISSION_RATE` value, if set.
    pub fn apply_rate_override(&mut self, value: Option<&str>) -> anyhow::Result<()> {
        if let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.settlement.commission_rate = raw
                .parse()
                .with_context(|| format!("{COMMISSION_RATE_ENV}={raw} is not a number"))?;
        }
        Ok(())
    }

    /// Validate and resolve the settlement section.
    pub fn settlement_settings(&self) -> anyhow::Result<SettlementSettings> {
        let rate = CommissionRate::from_percent(self.settlement.commission_rate)
            .context("settlement.commission_rate")?;
        let offset = offset_from_minutes(self.settlement.reporting_utc_offset_minutes)
            .context("settlement.reporting_utc_offset_minutes")?;
        Ok(SettlementSettings {
            rate,
            offset,
            eligible: EligibleStatuses::new(self.settlement.include_cash_pending),
        })
    }

    /// Default `EnvFilter` directive. Targets match by prefix, so `messpay`
    /// covers every workspace crate.
    pub fn log_directive(&self) -> String {
        format!("messpay={0},tower_http={0}", self.logging.level)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".messpay"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/messpay"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.settlement.commission_rate, 10.0);
        assert!(config.settlement.include_cash_pending);
        assert_eq!(config.settlement.reporting_utc_offset_minutes, 330);
        assert_eq!(config.analytics.top_max_limit, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = DaemonConfig::from_toml(
            "[settlement]\ncommission_rate = 12.5\ninclude_cash_pending = false\n",
        )
        .expect("parse");
        assert_eq!(config.settlement.commission_rate, 12.5);
        assert!(!config.settlement.include_cash_pending);
        assert_eq!(config.settlement.reporting_utc_offset_minutes, 330);
        assert_eq!(config.analytics.top_default_limit, 5);

        let settings = config.settlement_settings().expect("settings");
        assert_eq!(settings.rate.bps(), 1250);
        assert!(!settings.eligible.contains(&messpay_types::OrderStatus::CashPending));
    }

    #[test]
    fn test_rate_override() {
        let mut config = DaemonConfig::default();
        config.apply_rate_override(Some("15")).expect("override");
        assert_eq!(config.settlement.commission_rate, 15.0);
        config.apply_rate_override(None).expect("no override");
        assert_eq!(config.settlement.commission_rate, 15.0);
        assert!(config.apply_rate_override(Some("ten")).is_err());
    }

    #[test]
    fn test_invalid_rate_fails_validation() {
        let mut config = DaemonConfig::default();
        config.settlement.commission_rate = 150.0;
        assert!(config.settlement_settings().is_err());
        config.settlement.commission_rate = -1.0;
        assert!(config.settlement_settings().is_err());
    }

    #[test]
    fn test_invalid_offset_fails_validation() {
        let config = DaemonConfig::from_toml("[settlement]\nreporting_utc_offset_minutes = 1440\n")
            .expect("parse");
        let err = config.settlement_settings().expect_err("out of range");
        assert!(format!("{err:#}").contains("reporting_utc_offset_minutes"));

        let config = DaemonConfig::from_toml("[settlement]\nreporting_utc_offset_minutes = -300\n")
            .expect("parse");
        let settings = config.settlement_settings().expect("settings");
        assert_eq!(settings.offset.local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = DaemonConfig::from_toml(&toml_str).expect("parse");
        assert_eq!(parsed.settlement.commission_rate, config.settlement.commission_rate);
    }
}
