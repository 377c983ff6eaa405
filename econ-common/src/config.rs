//! Configuration management for the econ-watch service.
//!
//! Configuration lives in `~/.econ-watch/`, split into `config.json`,
//! `secrets.json` and `schedule.json` (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `FRED_API_KEY` → secrets.fred_api_key
//! - `TELEGRAM_BOT_TOKEN` → secrets.telegram_bot_token
//! - `TELEGRAM_CHAT_ID` → secrets.telegram_chat_id
//! - `TRIGGER_TOKEN` → secrets.trigger_token
//! - `PORT` → network.port
//! - `ECON_BIND_ADDRESS` → network.bind
//! - `ECON_LOG_LEVEL` → observability.log_level
//! - `ECON_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config_loader;
use crate::error::Error;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".econ-watch"),
        |dirs| dirs.home_dir().join(".econ-watch"),
    )
}

// ============================================================================
// Network Configuration
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0"
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listen port. Default: 8080
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Secrets
// ============================================================================

/// Credentials, normally loaded from `secrets.json` or the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    #[serde(default)]
    pub fred_api_key: Option<String>,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    /// Shared secret for the manual trigger endpoints.
    #[serde(default)]
    pub trigger_token: Option<String>,
}

// ============================================================================
// Data Source Configuration
// ============================================================================

/// FRED API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FredConfig {
    #[serde(default = "default_fred_base_url")]
    pub base_url: String,

    /// Minimum look-back window in days for every series.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default = "default_fred_timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive series requests.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Restrict tracking to these series codes. Empty means the full catalog.
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            base_url: default_fred_base_url(),
            lookback_days: default_lookback_days(),
            timeout_secs: default_fred_timeout(),
            request_delay_ms: default_request_delay_ms(),
            indicators: Vec::new(),
        }
    }
}

fn default_fred_base_url() -> String {
    "https://api.stlouisfed.org/fred".into()
}

fn default_lookback_days() -> i64 {
    30
}

fn default_fred_timeout() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    10
}

// ============================================================================
// Notification Configuration
// ============================================================================

/// Telegram delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Extra attempts per message chunk after the first failure.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            retry_count: default_retry_count(),
            timeout_secs: default_telegram_timeout(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_retry_count() -> u32 {
    3
}

fn default_telegram_timeout() -> u64 {
    30
}

// ============================================================================
// Schedule Configuration
// ============================================================================

/// Cron schedule for the report cycles.
///
/// Expressions use the 6-field format with seconds and are evaluated in the
/// configured fixed UTC offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Full daily report. Default: 08:00 local.
    #[serde(default = "default_daily_report_cron")]
    pub daily_report: String,

    /// Hourly critical indicator check.
    #[serde(default = "default_critical_check_cron")]
    pub critical_check: String,

    /// Local time offset from UTC in hours (KST = +9).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Label rendered next to local times in messages.
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,

    /// Retries for a failed scheduled run before giving up until next slot.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_report: default_daily_report_cron(),
            critical_check: default_critical_check_cron(),
            utc_offset_hours: default_utc_offset_hours(),
            timezone_label: default_timezone_label(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_daily_report_cron() -> String {
    "0 0 8 * * *".into()
}

fn default_critical_check_cron() -> String {
    "0 0 * * * *".into()
}

fn default_utc_offset_hours() -> i32 {
    9
}

fn default_timezone_label() -> String {
    "KST".into()
}

fn default_max_retries() -> u32 {
    1
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets filtered to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure for the econ-watch service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub fred: FredConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default directory, merging modular files.
    pub fn load() -> Result<Self> {
        let dir = config_dir();
        if !dir.exists() {
            tracing::info!("Config directory not found, using defaults");
            return Ok(Self::default());
        }

        let value = config_loader::load_modular_config(Some(dir.clone()))?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to parse config from {}", dir.display()))
    }

    /// Load configuration from a specific file. `~` is expanded.
    pub fn load_from(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let content = fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read config from {expanded}"))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {expanded}"))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, so tests need not touch the
    /// process environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("FRED_API_KEY") {
            self.secrets.fred_api_key = Some(key);
        }
        if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
            self.secrets.telegram_bot_token = Some(token);
        }
        if let Some(chat_id) = non_empty("TELEGRAM_CHAT_ID") {
            self.secrets.telegram_chat_id = Some(chat_id);
        }
        if let Some(token) = non_empty("TRIGGER_TOKEN") {
            self.secrets.trigger_token = Some(token);
        }

        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(bind) = non_empty("ECON_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Some(level) = non_empty("ECON_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = non_empty("ECON_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Check that every credential needed to run the service is present.
    pub fn validate(&self) -> crate::Result<()> {
        let mut missing = Vec::new();
        if self.fred_api_key().is_none() {
            missing.push("FRED_API_KEY");
        }
        if self.telegram_bot_token().is_none() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if self.telegram_chat_id().is_none() {
            missing.push("TELEGRAM_CHAT_ID");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if !(-12..=14).contains(&self.schedule.utc_offset_hours) {
            return Err(Error::Config(format!(
                "schedule.utc_offset_hours out of range: {}",
                self.schedule.utc_offset_hours
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Convenience accessors
    // =========================================================================

    /// Socket address string for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }

    pub fn fred_api_key(&self) -> Option<&str> {
        non_blank(self.secrets.fred_api_key.as_deref())
    }

    pub fn telegram_bot_token(&self) -> Option<&str> {
        non_blank(self.secrets.telegram_bot_token.as_deref())
    }

    pub fn telegram_chat_id(&self) -> Option<&str> {
        non_blank(self.secrets.telegram_chat_id.as_deref())
    }

    pub fn trigger_token(&self) -> Option<&str> {
        non_blank(self.secrets.trigger_token.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.secrets.fred_api_key = Some("fred".into());
        config.secrets.telegram_bot_token = Some("123:abc".into());
        config.secrets.telegram_chat_id = Some("-100".into());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.schedule.daily_report, "0 0 8 * * *");
        assert_eq!(config.schedule.critical_check, "0 0 * * * *");
        assert_eq!(config.schedule.utc_offset_hours, 9);
        assert_eq!(config.schedule.max_retries, 1);
        assert_eq!(config.fred.base_url, "https://api.stlouisfed.org/fred");
        assert!(config.fred.indicators.is_empty());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"network": {"port": 9000}, "observability": {"level": "debug"}}"#)
                .unwrap();
        assert_eq!(config.network.port, 9000);
        assert_eq!(config.network.bind, "0.0.0.0");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.telegram.retry_count, 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FRED_API_KEY", "key-1"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("PORT", "9999"),
            ("ECON_LOG_FORMAT", "json"),
            ("TRIGGER_TOKEN", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.fred_api_key(), Some("key-1"));
        assert_eq!(config.telegram_chat_id(), Some("42"));
        assert_eq!(config.network.port, 9999);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.trigger_token(), None);
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.network.port, 8080);
    }

    #[test]
    fn test_validate_reports_all_missing_credentials() {
        let err = Config::default().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("FRED_API_KEY"));
        assert!(msg.contains("TELEGRAM_BOT_TOKEN"));
        assert!(msg.contains("TELEGRAM_CHAT_ID"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_validate_complete_config() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_offset() {
        let mut config = complete_config();
        config.schedule.utc_offset_hours = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let mut config = complete_config();
        config.secrets.telegram_chat_id = Some("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"schedule": {{"daily_report": "0 30 7 * * *"}}}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.schedule.daily_report, "0 30 7 * * *");
        assert_eq!(config.schedule.timezone_label, "KST");
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = Config::load_from(Path::new("/nonexistent/econ-watch/config.json"));
        assert!(result.is_err());
    }
}
