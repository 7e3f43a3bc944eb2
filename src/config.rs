//! Configuration loading from TOML (or the legacy JSON shape).
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Telegram credentials are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{MonitorError, QuotePayload, WatchedCurrency};

/// Bybit P2P endpoint listing online advertisements.
pub const DEFAULT_QUOTES_URL: &str = "https://api2.bybit.com/fiat/otc/item/online";
const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
const DEFAULT_LOG_FILE: &str = "p2p-monitor.log";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    pub currencies: Vec<CurrencyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    /// Cooldown for a currency after a matching order was reported.
    pub sleep_after_match_minutes: u64,
    /// Minimum spacing between the starts of two fetch cycles.
    pub fetch_interval_secs: u64,
    pub tick_interval_ms: u64,
    pub startup_delay_secs: u64,
    /// Stop the tick loop on the first unexpected cycle error.
    pub halt_on_error: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sleep_after_match_minutes: 60,
            fetch_interval_secs: 30,
            tick_interval_ms: 1000,
            startup_delay_secs: 5,
            halt_on_error: false,
        }
    }
}

impl MonitorConfig {
    pub fn sleep_after_match(&self) -> Duration {
        Duration::from_secs(self.sleep_after_match_minutes.saturating_mul(60))
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuotesConfig {
    pub url: String,
    pub user_id: u64,
    pub token_id: String,
    pub payment: Vec<String>,
    pub side: String,
    pub size: String,
    pub request_timeout_secs: u64,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QUOTES_URL.to_string(),
            user_id: 110341422,
            token_id: "USDT".to_string(),
            payment: vec!["359".to_string()],
            side: "0".to_string(),
            size: "1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl QuotesConfig {
    /// Request body for the first page of quotes in `currency`.
    pub fn payload_for(&self, currency: &str) -> QuotePayload {
        QuotePayload {
            user_id: self.user_id,
            token_id: self.token_id.clone(),
            currency_id: currency.to_string(),
            payment: self.payment.clone(),
            side: self.side.clone(),
            size: self.size.clone(),
            page: "1".to_string(),
            amount: String::new(),
            auth_maker: false,
            can_trade: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Fixed pause between attempts. Zero retries immediately.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token_env: String,
    pub chat_id_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id_env: "TELEGRAM_CHAT_ID".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// Draw the live terminal view. When off, status goes to the log.
    pub terminal: bool,
    /// Where logs go while the terminal view owns the screen.
    pub log_file: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            terminal: true,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Destination of the `tracing` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl DisplayConfig {
    /// The terminal view and the log can't share a screen, so logs move
    /// to a file while the view is on.
    pub fn log_target(&self) -> LogTarget {
        if self.terminal {
            LogTarget::File(PathBuf::from(&self.log_file))
        } else {
            LogTarget::Stderr
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurrencyConfig {
    pub currency: String,
    #[serde(alias = "desiredPrice")]
    pub desired_price: Decimal,
}

/// Legacy `config.json` shape: only the cooldown and the currency list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyConfig {
    sleep_time_after_finding_desired_order: u64,
    watched_currencies: Vec<CurrencyConfig>,
}

impl From<LegacyConfig> for AppConfig {
    fn from(legacy: LegacyConfig) -> Self {
        AppConfig {
            monitor: MonitorConfig {
                sleep_after_match_minutes: legacy.sleep_time_after_finding_desired_order,
                ..MonitorConfig::default()
            },
            quotes: QuotesConfig::default(),
            retry: RetryConfig::default(),
            telegram: TelegramConfig::default(),
            display: DisplayConfig::default(),
            currencies: legacy.watched_currencies,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, or a `.json` file in the legacy shape.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;

        let is_json = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_legacy_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
        .with_context(|| format!("Failed to parse config file: {path}"))?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_legacy_json(contents: &str) -> Result<Self> {
        let legacy: LegacyConfig = serde_json::from_str(contents)?;
        Ok(legacy.into())
    }

    /// Reject configurations the scheduler can't run with.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.currencies.is_empty() {
            return Err(MonitorError::Config("no currencies to watch".into()));
        }

        let mut seen = HashSet::new();
        for c in &self.currencies {
            if c.currency.trim().is_empty() {
                return Err(MonitorError::Config("empty currency code".into()));
            }
            if !seen.insert(c.currency.as_str()) {
                return Err(MonitorError::Config(format!(
                    "currency {} listed twice",
                    c.currency
                )));
            }
            if c.desired_price.is_sign_negative() {
                return Err(MonitorError::Config(format!(
                    "negative desired price for {}",
                    c.currency
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(MonitorError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.display.terminal && self.display.log_file.trim().is_empty() {
            return Err(MonitorError::Config(
                "display.log_file is required with the terminal view".into(),
            ));
        }
        if self.monitor.tick_interval_ms == 0 {
            return Err(MonitorError::Config("monitor.tick_interval_ms must be positive".into()));
        }

        Ok(())
    }

    /// Build the scheduler's per-currency state, in configured order.
    pub fn watched_currencies(&self) -> Vec<WatchedCurrency> {
        self.currencies
            .iter()
            .map(|c| {
                WatchedCurrency::new(
                    c.currency.clone(),
                    c.desired_price,
                    self.quotes.payload_for(&c.currency),
                )
            })
            .collect()
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
