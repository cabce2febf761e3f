//! Append-only JSONL record of every submitted transaction.
//!
//! Best-effort: a write failure is logged and swallowed, it never affects
//! the running cycle.

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub timestamp: DateTime<Utc>,
    pub network: String,
    /// Truncated wallet address.
    pub wallet: String,
    pub action: String,
    pub amount: Option<String>,
    pub tx_hash: Option<String>,
    pub explorer_url: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl TxRecord {
    /// Append this record as one JSON line, creating parent directories as
    /// needed.
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

/// Best-effort append.
pub fn record<P: AsRef<Path>>(path: P, record: &TxRecord) {
    if let Err(e) = record.append_to_file(&path) {
        warn!(
            "failed to append run log entry to {}: {e}",
            path.as_ref().display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_path() -> std::path::PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "r2runner-txlog-{}-{n}/transactions.jsonl",
            std::process::id()
        ))
    }

    fn sample(success: bool) -> TxRecord {
        TxRecord {
            timestamp: Utc::now(),
            network: "Sepolia".to_string(),
            wallet: "0x1234..5678".to_string(),
            action: "USDC to R2USD swap".to_string(),
            amount: Some("1.5".to_string()),
            tx_hash: success.then(|| "0xabc".to_string()),
            explorer_url: success.then(|| "https://sepolia.etherscan.io/tx/0xabc".to_string()),
            success,
            failure_reason: (!success).then(|| "insufficient USDC balance".to_string()),
        }
    }

    #[test]
    fn test_append_creates_parents_and_appends_lines() {
        let path = scratch_path();
        sample(true).append_to_file(&path).unwrap();
        sample(false).append_to_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: TxRecord = serde_json::from_str(lines[0]).unwrap();
        assert!(first.success);
        assert_eq!(first.amount.as_deref(), Some("1.5"));

        let second: TxRecord = serde_json::from_str(lines[1]).unwrap();
        assert!(!second.success);
        assert!(second.failure_reason.is_some());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_record_swallows_write_errors() {
        // A directory path cannot be opened as a file; must not panic.
        let bad = std::env::temp_dir();
        record(&bad, &sample(true));
    }
}
