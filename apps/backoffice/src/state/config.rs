//! # Configuration State
//!
//! Stores application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`PHARMADESK_*`)
//! 2. Defaults (this file)
//!
//! Bill layout and sales tax are account data, persisted and edited through
//! the workspace; only process-level settings live here.
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;
use std::time::Duration;

use pharmadesk_core::money::{format_money, to_decimal};
use pharmadesk_core::DEFAULT_ACCOUNT_ID;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Notifications disappear after this long unless dismissed first.
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 3_000;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Account namespace for persisted state.
    /// Default: "local" (single-operator install)
    pub account_id: String,

    /// Database file; `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Auto-dismiss delay for notifications, in milliseconds.
    pub notification_ttl_ms: u64,

    /// Currency symbol (for display)
    pub currency_symbol: String,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            database_path: None,
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL_MS,
            currency_symbol: "Rs.".to_string(),
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `PHARMADESK_ACCOUNT_ID`: Account namespace
    /// - `PHARMADESK_DB_PATH`: Database file override
    /// - `PHARMADESK_NOTIFICATION_TTL_MS`: Notification lifetime
    /// - `PHARMADESK_CURRENCY_SYMBOL`: Display symbol
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(account_id) = lookup("PHARMADESK_ACCOUNT_ID") {
            let trimmed = account_id.trim();
            if !trimmed.is_empty() {
                config.account_id = trimmed.to_string();
            }
        }

        if let Some(path) = lookup("PHARMADESK_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(ttl) = lookup("PHARMADESK_NOTIFICATION_TTL_MS") {
            match ttl.trim().parse::<u64>() {
                Ok(ms) => config.notification_ttl_ms = ms,
                Err(_) => warn!(value = %ttl, "Ignoring invalid PHARMADESK_NOTIFICATION_TTL_MS"),
            }
        }

        if let Some(symbol) = lookup("PHARMADESK_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        config
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    /// Formats an amount with the currency symbol and two decimals.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234.5), "Rs. 1234.50");
    /// ```
    pub fn format_currency(&self, amount: f64) -> String {
        let formatted = match to_decimal(amount.abs()) {
            Ok(value) => format_money(value),
            Err(_) => format!("{:.2}", amount.abs()),
        };
        let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
        if self.currency_symbol.is_empty() {
            format!("{}{}", sign, formatted)
        } else {
            format!("{}{} {}", sign, self.currency_symbol, formatted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ConfigState::from_lookup(lookup(&[]));
        assert_eq!(config, ConfigState::default());
        assert_eq!(config.account_id, "local");
    }

    #[test]
    fn test_environment_overrides() {
        let config = ConfigState::from_lookup(lookup(&[
            ("PHARMADESK_ACCOUNT_ID", " acct-7 "),
            ("PHARMADESK_DB_PATH", "/tmp/pd.db"),
            ("PHARMADESK_NOTIFICATION_TTL_MS", "5000"),
            ("PHARMADESK_CURRENCY_SYMBOL", "$"),
        ]));
        assert_eq!(config.account_id, "acct-7");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/pd.db")));
        assert_eq!(config.notification_ttl(), Duration::from_secs(5));
        assert_eq!(config.currency_symbol, "$");
    }

    #[test]
    fn test_invalid_ttl_keeps_default() {
        let config = ConfigState::from_lookup(lookup(&[("PHARMADESK_NOTIFICATION_TTL_MS", "soon")]));
        assert_eq!(config.notification_ttl_ms, DEFAULT_NOTIFICATION_TTL_MS);
    }

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(1234.5), "Rs. 1234.50");
        assert_eq!(config.format_currency(0.0), "Rs. 0.00");
        assert_eq!(config.format_currency(-9.375), "-Rs. 9.38");
    }
}
