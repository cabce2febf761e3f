//! Runtime configuration.
//!
//! Loaded once at startup from environment variables (with `.env` support)
//! or from a TOML file, then passed by reference into the orchestrator - no
//! ambient mutable globals. Private keys always come from `PRIVATE_KEY_*`
//! environment variables and never touch the config file.

use crate::retry::RetryPolicy;
use crate::session::truncated;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// A usable private key: exactly 64 hex digits after an optional `0x`.
pub fn is_valid_private_key(key: &str) -> bool {
    let hex_part = key.strip_prefix("0x").unwrap_or(key);
    hex_part.len() == 64 && hex_part.bytes().all(|b| b.is_ascii_hexdigit())
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Connection ==========
    /// Newline-delimited proxy list; a missing file means direct connections.
    pub proxies_path: String,

    /// Bound on a single receipt wait before the operation is failed.
    pub receipt_timeout_secs: u64,

    // ========== Pacing & retry ==========
    /// Randomized delay bounds between successive transactions.
    pub pace_min_secs: u64,
    pub pace_max_secs: u64,

    /// Total submission attempts per transaction.
    pub retry_attempts: u32,

    /// Pause between full cycles over all networks and wallets.
    pub cycle_pause_hours: u64,

    // ========== Run log ==========
    /// Append-only JSONL record of every submitted transaction.
    pub run_log_path: String,

    // ========== Wallets ==========
    /// Validated private keys, loaded from `PRIVATE_KEY_*` env vars.
    #[serde(skip)]
    pub private_keys: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables and `.env`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self {
            proxies_path: env::var("PROXIES_PATH").unwrap_or_else(|_| "proxies.txt".to_string()),
            receipt_timeout_secs: env::var("RECEIPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "180".to_string())
                .parse()
                .unwrap_or(180),
            pace_min_secs: env::var("PACE_MIN_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            pace_max_secs: env::var("PACE_MAX_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            retry_attempts: env::var("RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            cycle_pause_hours: env::var("CYCLE_PAUSE_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            run_log_path: env::var("RUN_LOG_PATH")
                .unwrap_or_else(|_| "./logs/transactions.jsonl".to_string()),
            private_keys: Vec::new(),
        };

        config.private_keys = keys_from_env();
        Ok(config)
    }

    /// Load tunables from a TOML file; keys still come from the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.private_keys = keys_from_env();
        Ok(config)
    }

    /// Reject configurations the orchestrator cannot run with. The absence
    /// of any valid private key is fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.private_keys.is_empty() {
            return Err(eyre::eyre!(
                "no valid private keys found (set PRIVATE_KEY_1, PRIVATE_KEY_2, ... in .env)"
            ));
        }
        if self.pace_min_secs > self.pace_max_secs {
            return Err(eyre::eyre!(
                "PACE_MIN_SECS ({}) exceeds PACE_MAX_SECS ({})",
                self.pace_min_secs,
                self.pace_max_secs
            ));
        }
        if self.retry_attempts == 0 {
            return Err(eyre::eyre!("RETRY_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            min_delay: Duration::from_secs(self.pace_min_secs),
            max_delay: Duration::from_secs(self.pace_max_secs),
        }
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn pace_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.pace_min_secs),
            Duration::from_secs(self.pace_max_secs),
        )
    }

    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs(self.cycle_pause_hours * 60 * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxies_path: "proxies.txt".to_string(),
            receipt_timeout_secs: 180,
            pace_min_secs: 5,
            pace_max_secs: 10,
            retry_attempts: 3,
            cycle_pause_hours: 24,
            run_log_path: "./logs/transactions.jsonl".to_string(),
            private_keys: Vec::new(),
        }
    }
}

// ============================================
// KEY LOADING
// ============================================

fn keys_from_env() -> Vec<String> {
    keys_from_vars(env::vars())
}

/// Collect and validate `PRIVATE_KEY_*` entries. Variable names are sorted
/// so wallet order is stable across runs; invalid keys are skipped with a
/// truncated warning, never echoed in full.
fn keys_from_vars(vars: impl Iterator<Item = (String, String)>) -> Vec<String> {
    let mut named: Vec<(String, String)> = vars
        .filter(|(name, value)| name.starts_with("PRIVATE_KEY_") && !value.trim().is_empty())
        .collect();
    named.sort_by(|a, b| a.0.cmp(&b.0));

    let mut keys = Vec::new();
    for (name, value) in named {
        let value = value.trim().to_string();
        if is_valid_private_key(&value) {
            keys.push(value);
        } else {
            warn!(
                "{name} ({}) is not a 64-hex-digit private key, skipping",
                truncated(&value)
            );
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_valid_private_keys() {
        assert!(is_valid_private_key(GOOD_KEY));
        assert!(is_valid_private_key(&format!("0x{GOOD_KEY}")));
        assert!(is_valid_private_key(&GOOD_KEY.to_uppercase()));
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(!is_valid_private_key(""));
        assert!(!is_valid_private_key("0x"));
        assert!(!is_valid_private_key(&GOOD_KEY[..63]));
        assert!(!is_valid_private_key(&format!("{GOOD_KEY}0")));
        assert!(!is_valid_private_key(&format!("zz{}", &GOOD_KEY[2..])));
    }

    #[test]
    fn test_keys_from_vars_filters_and_sorts() {
        let vars = vec![
            ("PRIVATE_KEY_2".to_string(), format!("0x{GOOD_KEY}")),
            ("PRIVATE_KEY_1".to_string(), GOOD_KEY.to_string()),
            ("PRIVATE_KEY_3".to_string(), "garbage".to_string()),
            ("UNRELATED".to_string(), GOOD_KEY.to_string()),
            ("PRIVATE_KEY_4".to_string(), "  ".to_string()),
        ];
        let keys = keys_from_vars(vars.into_iter());
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], GOOD_KEY);
        assert_eq!(keys[1], format!("0x{GOOD_KEY}"));
    }

    #[test]
    fn test_validate_rejects_missing_keys() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_pacing() {
        let config = Config {
            private_keys: vec![GOOD_KEY.to_string()],
            pace_min_secs: 20,
            pace_max_secs: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_accepts_one_key() {
        let config = Config {
            private_keys: vec![GOOD_KEY.to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().attempts, 3);
        assert_eq!(config.cycle_pause(), Duration::from_secs(24 * 60 * 60));
    }
}
