//! Engine error taxonomy.
//!
//! Errors that matter to control flow get their own variant; callers match
//! on them to decide skip vs. abort. Balance/fee/gas read errors never reach
//! this type - those paths substitute safe defaults instead.

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Every RPC candidate for a network was tried and failed.
    #[error("all RPC endpoints failed for {network}: {last_error}")]
    Connection { network: String, last_error: String },

    /// Malformed address, private key, amount, or selection input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Requested amount exceeds the source-token balance.
    #[error("insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientBalance {
        symbol: &'static str,
        have: String,
        need: String,
    },

    /// Native balance cannot cover the worst-case gas cost.
    #[error("insufficient native balance for gas: have {have} wei, worst case {need} wei")]
    InsufficientGas { have: String, need: String },

    /// The approval transaction failed or never confirmed.
    #[error("approval for spender {spender} did not succeed")]
    Approval { spender: Address },

    /// The node rejected or errored before returning a transaction hash.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// The receipt reported failure, or the wait timed out or errored.
    #[error("transaction confirmation failed: {0}")]
    Confirmation(String),
}

impl EngineError {
    /// True for the precondition failures that make further attempts for the
    /// same wallet pointless (exhausted funds).
    pub fn is_funds_exhaustion(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientBalance { .. } | EngineError::InsufficientGas { .. }
        )
    }
}
