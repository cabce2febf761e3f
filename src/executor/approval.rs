//! Allowance management.
//!
//! An approval is submitted only when the existing allowance is short of
//! the requested amount; a covering allowance is an idempotent fast path
//! with no transaction. Every failure collapses to `false` - approval
//! failure is recoverable at the caller, never process-fatal.

use crate::errors::EngineError;
use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Fixed gas limit for approval transactions.
pub const APPROVAL_GAS_LIMIT: u64 = 100_000;

/// The token operations the approval flow needs, kept behind a seam so the
/// idempotent fast path is testable with a stub contract.
#[async_trait]
pub trait TokenOps {
    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, EngineError>;

    /// Submit an approval and wait for one confirmation.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, EngineError>;
}

pub(crate) fn allowance_covers(current: U256, requested: U256) -> bool {
    current >= requested
}

/// Ensure `spender` may move `amount` of `token`.
pub async fn ensure_allowance(
    ops: &dyn TokenOps,
    token: Address,
    spender: Address,
    amount: U256,
) -> bool {
    if token == Address::ZERO || spender == Address::ZERO {
        warn!("invalid token ({token}) or spender ({spender}) address, skipping approval");
        return false;
    }

    let current = match ops.allowance(token, spender).await {
        Ok(current) => current,
        Err(e) => {
            warn!("allowance read failed: {e}");
            return false;
        }
    };

    if allowance_covers(current, amount) {
        debug!("sufficient allowance already exists");
        return true;
    }

    match ops.approve(token, spender, amount).await {
        Ok(hash) => {
            info!("approval confirmed: {hash}");
            true
        }
        Err(e) => {
            warn!("approval failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubToken {
        allowance: Result<U256, ()>,
        approve_ok: bool,
        approve_calls: AtomicUsize,
    }

    impl StubToken {
        fn with_allowance(allowance: u64) -> Self {
            Self {
                allowance: Ok(U256::from(allowance)),
                approve_ok: true,
                approve_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenOps for StubToken {
        async fn allowance(&self, _token: Address, _spender: Address) -> Result<U256, EngineError> {
            self.allowance
                .map_err(|_| EngineError::Submission("allowance read failed".to_string()))
        }

        async fn approve(
            &self,
            _token: Address,
            spender: Address,
            _amount: U256,
        ) -> Result<TxHash, EngineError> {
            self.approve_calls.fetch_add(1, Ordering::Relaxed);
            if self.approve_ok {
                Ok(TxHash::ZERO)
            } else {
                Err(EngineError::Approval { spender })
            }
        }
    }

    fn token() -> Address {
        Address::from([0x11u8; 20])
    }

    fn spender() -> Address {
        Address::from([0x22u8; 20])
    }

    #[test]
    fn test_allowance_covers() {
        assert!(allowance_covers(U256::from(100u64), U256::from(50u64)));
        assert!(allowance_covers(U256::from(50u64), U256::from(50u64)));
        assert!(!allowance_covers(U256::from(49u64), U256::from(50u64)));
    }

    #[tokio::test]
    async fn test_covering_allowance_submits_nothing() {
        let stub = StubToken::with_allowance(100);
        let ok = ensure_allowance(&stub, token(), spender(), U256::from(50u64)).await;
        assert!(ok);
        assert_eq!(stub.approve_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_short_allowance_submits_approval() {
        let stub = StubToken::with_allowance(10);
        let ok = ensure_allowance(&stub, token(), spender(), U256::from(50u64)).await;
        assert!(ok);
        assert_eq!(stub.approve_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_allowance_read_failure_is_recoverable() {
        let stub = StubToken {
            allowance: Err(()),
            approve_ok: true,
            approve_calls: AtomicUsize::new(0),
        };
        let ok = ensure_allowance(&stub, token(), spender(), U256::from(50u64)).await;
        assert!(!ok);
        assert_eq!(stub.approve_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_approval_failure_returns_false() {
        let stub = StubToken {
            allowance: Ok(U256::ZERO),
            approve_ok: false,
            approve_calls: AtomicUsize::new(0),
        };
        let ok = ensure_allowance(&stub, token(), spender(), U256::from(50u64)).await;
        assert!(!ok);
        assert_eq!(stub.approve_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_zero_addresses_are_rejected() {
        let stub = StubToken::with_allowance(100);
        assert!(!ensure_allowance(&stub, Address::ZERO, spender(), U256::from(1u64)).await);
        assert!(!ensure_allowance(&stub, token(), Address::ZERO, U256::from(1u64)).await);
        assert_eq!(stub.approve_calls.load(Ordering::Relaxed), 0);
    }
}
