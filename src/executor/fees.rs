//! Fee policy and gas limit estimation with static fallbacks.
//!
//! Neither estimator fails outward: on any error the static fallback is
//! substituted, trading a slightly pessimistic cost for workflow
//! continuity. Every transaction attempt always has usable parameters.

use alloy_primitives::U256;
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types::TransactionRequest;
use tracing::warn;

const GWEI: u128 = 1_000_000_000;

/// Fallback fee policy when the node's fee data is unusable.
pub const FALLBACK_MAX_FEE_GWEI: u128 = 50;
pub const FALLBACK_PRIORITY_FEE_GWEI: u128 = 2;

/// Headroom applied on top of the node's gas estimate, in percent.
pub const GAS_HEADROOM_PCT: u64 = 20;

/// Fallback gas limit when estimation fails.
pub const FALLBACK_GAS_LIMIT: u64 = 200_000;

/// Fixed low-fee policy for the R2USD -> USDC path, preserved from the
/// original flow which prices that swap statically instead of asking the
/// node. See DESIGN.md.
pub const SWAP_OUT_MAX_FEE_GWEI: u128 = 30;
pub const SWAP_OUT_PRIORITY_FEE_GWEI: u128 = 1;

// ============================================
// FEE POLICY
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl FeePolicy {
    pub fn fallback() -> Self {
        Self {
            max_fee_per_gas: FALLBACK_MAX_FEE_GWEI * GWEI,
            max_priority_fee_per_gas: FALLBACK_PRIORITY_FEE_GWEI * GWEI,
        }
    }

    pub fn fixed_low() -> Self {
        Self {
            max_fee_per_gas: SWAP_OUT_MAX_FEE_GWEI * GWEI,
            max_priority_fee_per_gas: SWAP_OUT_PRIORITY_FEE_GWEI * GWEI,
        }
    }

    /// Worst-case native cost of a transaction under this policy.
    pub fn worst_case_cost(&self, gas_limit: u64) -> U256 {
        U256::from(self.max_fee_per_gas) * U256::from(gas_limit)
    }
}

/// Derive a fee policy from network fee data. A failed query, or a zero
/// field in the response, substitutes the fixed default for that field.
pub async fn estimate_fees(provider: &DynProvider) -> FeePolicy {
    match provider.estimate_eip1559_fees().await {
        Ok(estimate) => {
            let fallback = FeePolicy::fallback();
            FeePolicy {
                max_fee_per_gas: if estimate.max_fee_per_gas == 0 {
                    fallback.max_fee_per_gas
                } else {
                    estimate.max_fee_per_gas
                },
                max_priority_fee_per_gas: if estimate.max_priority_fee_per_gas == 0 {
                    fallback.max_priority_fee_per_gas
                } else {
                    estimate.max_priority_fee_per_gas
                },
            }
        }
        Err(e) => {
            warn!("fee estimation failed, using defaults: {e}");
            FeePolicy::fallback()
        }
    }
}

// ============================================
// GAS LIMIT
// ============================================

/// Ask the node for a gas estimate and inflate it with headroom; fall back
/// to the static limit on any error.
pub async fn estimate_gas_limit(provider: &DynProvider, tx: &TransactionRequest) -> u64 {
    match provider.estimate_gas(tx.clone()).await {
        Ok(estimate) => apply_headroom(estimate),
        Err(e) => {
            warn!("gas estimation failed, using fallback limit: {e}");
            FALLBACK_GAS_LIMIT
        }
    }
}

pub(crate) fn apply_headroom(estimate: u64) -> u64 {
    estimate.saturating_mul(100 + GAS_HEADROOM_PCT) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headroom_inflates_by_twenty_percent() {
        assert_eq!(apply_headroom(100_000), 120_000);
        assert_eq!(apply_headroom(0), 0);
        assert_eq!(apply_headroom(1), 1);
    }

    #[test]
    fn test_fallback_policy_values() {
        let policy = FeePolicy::fallback();
        assert_eq!(policy.max_fee_per_gas, 50 * GWEI);
        assert_eq!(policy.max_priority_fee_per_gas, 2 * GWEI);
    }

    #[test]
    fn test_worst_case_cost() {
        let policy = FeePolicy::fallback();
        // 200_000 gas at 50 gwei = 0.01 ETH
        assert_eq!(
            policy.worst_case_cost(FALLBACK_GAS_LIMIT),
            U256::from(10_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_fixed_low_policy_is_below_fallback() {
        let low = FeePolicy::fixed_low();
        let fallback = FeePolicy::fallback();
        assert!(low.max_fee_per_gas < fallback.max_fee_per_gas);
        assert!(low.max_priority_fee_per_gas < fallback.max_priority_fee_per_gas);
    }
}
