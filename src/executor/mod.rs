//! Swap and stake execution.
//!
//! The three campaign operations share one shape: resolve an amount, check
//! balance preconditions, ensure allowance, build calldata for the
//! network's encoding, submit with retry, wait one confirmation, and
//! re-read balances. Failures never escape an operation - every path
//! collapses into an [`ActionOutcome`] so one wallet's trouble cannot
//! abort a running cycle.

pub mod approval;
pub mod balances;
pub mod fees;

use crate::amounts;
use crate::errors::EngineError;
use crate::networks::{CallEncoding, ContractSet};
use crate::retry::{with_retry, RetryPolicy};
use crate::session::WalletSession;
use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall, SolValue};
use approval::{TokenOps, APPROVAL_GAS_LIMIT};
use async_trait::async_trait;
use balances::IERC20;
use fees::FeePolicy;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

sol! {
    interface ICurvePool {
        function exchange(int128 i, int128 j, uint256 dx, uint256 min_dy) external returns (uint256);
    }
}

/// Autonomous-mode amount range, in human token units.
pub const RANDOM_AMOUNT_MIN: f64 = 0.1;
pub const RANDOM_AMOUNT_MAX: f64 = 2.0;

/// Slippage tolerance on canonical exchange calls, in percent.
pub const SLIPPAGE_PCT: u64 = 3;

// ============================================
// ACTIONS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    SwapUsdcToR2usd,
    SwapR2usdToUsdc,
    StakeR2usd,
}

impl ActionKind {
    /// Auto-run order: swap in, swap out, stake.
    pub fn all() -> [ActionKind; 3] {
        [
            ActionKind::SwapUsdcToR2usd,
            ActionKind::SwapR2usdToUsdc,
            ActionKind::StakeR2usd,
        ]
    }

    pub fn source_symbol(&self) -> &'static str {
        match self {
            ActionKind::SwapUsdcToR2usd => "USDC",
            ActionKind::SwapR2usdToUsdc => "R2USD",
            ActionKind::StakeR2usd => "R2USD",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::SwapUsdcToR2usd => write!(f, "USDC to R2USD swap"),
            ActionKind::SwapR2usdToUsdc => write!(f, "R2USD to USDC swap"),
            ActionKind::StakeR2usd => write!(f, "R2USD staking"),
        }
    }
}

// ============================================
// OUTCOME
// ============================================

#[derive(Debug)]
pub enum ActionOutcome {
    Success {
        hash: TxHash,
        explorer_url: String,
        amount: String,
        post_balances: PostBalances,
    },
    Failure {
        error: EngineError,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }
}

/// Balances re-read after a confirmed transaction, for display.
#[derive(Debug)]
pub struct PostBalances {
    pub source: String,
    pub target: String,
}

/// Per-operation wiring: which token is spent, which is received, and which
/// contract both takes the approval and receives the call.
struct OpSpec {
    source: Address,
    target: Address,
    spender: Address,
    source_symbol: &'static str,
}

fn spec_for(kind: ActionKind, contracts: &ContractSet) -> OpSpec {
    let (source, target, spender) = match kind {
        ActionKind::SwapUsdcToR2usd => (contracts.usdc, contracts.r2usd, contracts.swap_in),
        ActionKind::SwapR2usdToUsdc => (contracts.r2usd, contracts.usdc, contracts.swap_out),
        ActionKind::StakeR2usd => (contracts.r2usd, contracts.sr2usd, contracts.stake),
    };
    OpSpec {
        source,
        target,
        spender,
        source_symbol: kind.source_symbol(),
    }
}

// ============================================
// AMOUNT RESOLUTION & PRECONDITIONS
// ============================================

/// Caller-supplied amount, or a uniform draw from the autonomous range,
/// rendered to smallest units. Also returns the normalized human string.
pub(crate) fn resolve_amount(
    requested: Option<f64>,
    decimals: u8,
    rng: &mut impl Rng,
) -> Result<(U256, String), EngineError> {
    let human = match requested {
        Some(value) => value,
        None => rng.gen_range(RANDOM_AMOUNT_MIN..=RANDOM_AMOUNT_MAX),
    };
    let base = amounts::f64_to_base_units(human, decimals)?;
    Ok((base, amounts::from_base_units(base, decimals)))
}

pub(crate) fn ensure_spendable(
    symbol: &'static str,
    balance: U256,
    requested: U256,
    decimals: u8,
) -> Result<(), EngineError> {
    if requested > balance {
        return Err(EngineError::InsufficientBalance {
            symbol,
            have: amounts::from_base_units(balance, decimals),
            need: amounts::from_base_units(requested, decimals),
        });
    }
    Ok(())
}

/// Worst case uses the static fallback limit: the real limit is not known
/// until the call is prepared, and this check runs before approval.
pub(crate) fn ensure_gas_budget(native: U256, fee: &FeePolicy) -> Result<(), EngineError> {
    let worst_case = fee.worst_case_cost(fees::FALLBACK_GAS_LIMIT);
    if native < worst_case {
        return Err(EngineError::InsufficientGas {
            have: native.to_string(),
            need: worst_case.to_string(),
        });
    }
    Ok(())
}

// ============================================
// CALLDATA
// ============================================

/// Build the call payload for an operation under the network's encoding.
///
/// Staking always takes the selector-padded form; the canonical exchange
/// interface only covers the two swap directions.
pub(crate) fn build_calldata(
    kind: ActionKind,
    encoding: CallEncoding,
    contracts: &ContractSet,
    signer: Address,
    amount: U256,
) -> Bytes {
    match (kind, encoding) {
        (ActionKind::StakeR2usd, _) => selector_padded_stake(contracts.stake_selector, amount),
        (ActionKind::SwapUsdcToR2usd, CallEncoding::SelectorPadded) => {
            selector_padded_swap(contracts.swap_in_selector, signer, amount)
        }
        (ActionKind::SwapR2usdToUsdc, CallEncoding::SelectorPadded) => {
            selector_padded_swap(contracts.swap_out_selector, signer, amount)
        }
        (ActionKind::SwapUsdcToR2usd, CallEncoding::CanonicalExchange) => exchange_call(0, 1, amount),
        (ActionKind::SwapR2usdToUsdc, CallEncoding::CanonicalExchange) => exchange_call(1, 0, amount),
    }
}

/// Selector followed by a fixed 7-slot tuple: signer, amount, and five
/// zero-filled words.
fn selector_padded_swap(selector: [u8; 4], signer: Address, amount: U256) -> Bytes {
    let args = (
        signer,
        amount,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
        U256::ZERO,
    );
    let mut data = selector.to_vec();
    data.extend_from_slice(&args.abi_encode());
    data.into()
}

/// Selector followed by the amount left-padded to one 32-byte word.
fn selector_padded_stake(selector: [u8; 4], amount: U256) -> Bytes {
    let mut data = selector.to_vec();
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data.into()
}

/// `exchange(i, j, dx, min_dy)` with the fixed slippage tolerance applied.
fn exchange_call(i: i128, j: i128, amount: U256) -> Bytes {
    let min_dy = amount * U256::from(100 - SLIPPAGE_PCT) / U256::from(100);
    ICurvePool::exchangeCall {
        i,
        j,
        dx: amount,
        min_dy,
    }
    .abi_encode()
    .into()
}

// ============================================
// TOKEN OPS (live implementation)
// ============================================

pub struct SessionTokenOps<'a> {
    session: &'a WalletSession,
    receipt_timeout: Duration,
}

#[async_trait]
impl TokenOps for SessionTokenOps<'_> {
    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, EngineError> {
        balances::allowance(self.session, token, spender).await
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, EngineError> {
        let call = IERC20::approveCall { spender, amount };
        let tx = TransactionRequest::default()
            .with_from(self.session.address)
            .with_to(token)
            .with_input(call.abi_encode())
            .with_gas_limit(APPROVAL_GAS_LIMIT);

        let pending = self
            .session
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| EngineError::Submission(format!("approval submission failed: {e}")))?;
        let hash = *pending.tx_hash();
        info!(
            "approval transaction sent: {}",
            self.session.network.explorer_tx_url(&format!("{hash}"))
        );

        let receipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| EngineError::Confirmation(format!("approval wait failed: {e}")))?;
        if !receipt.status() {
            return Err(EngineError::Confirmation(
                "approval transaction reverted".to_string(),
            ));
        }
        Ok(hash)
    }
}

// ============================================
// EXECUTOR
// ============================================

pub struct ActionExecutor<'a> {
    session: &'a WalletSession,
    retry: RetryPolicy,
    receipt_timeout: Duration,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(session: &'a WalletSession, retry: RetryPolicy, receipt_timeout: Duration) -> Self {
        Self {
            session,
            retry,
            receipt_timeout,
        }
    }

    /// Run one operation to completion. Never panics or propagates an
    /// error; the outcome carries either the receipt hash or the reason.
    pub async fn execute(&self, kind: ActionKind, amount: Option<f64>) -> ActionOutcome {
        match self.run(kind, amount).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("{kind} failed: {error}");
                ActionOutcome::Failure { error }
            }
        }
    }

    async fn run(
        &self,
        kind: ActionKind,
        requested: Option<f64>,
    ) -> Result<ActionOutcome, EngineError> {
        let network = self.session.network;
        let spec = spec_for(kind, &network.contracts);

        let decimals = balances::token_decimals_or_default(self.session, spec.source).await;
        let (amount_base, amount_human) =
            resolve_amount(requested, decimals, &mut rand::thread_rng())?;
        info!("{kind}: {amount_human} {}", spec.source_symbol);

        // Preconditions come before approval: there is no point paying for
        // an approval the transfer cannot use.
        let balance = balances::token_balance_or_zero(self.session, spec.source).await;
        ensure_spendable(spec.source_symbol, balance, amount_base, decimals)?;

        let fee = if kind == ActionKind::SwapR2usdToUsdc {
            FeePolicy::fixed_low()
        } else {
            fees::estimate_fees(&self.session.provider).await
        };
        if kind == ActionKind::SwapUsdcToR2usd {
            let native = balances::native_balance(self.session)
                .await
                .unwrap_or(U256::ZERO);
            ensure_gas_budget(native, &fee)?;
        }

        let ops = SessionTokenOps {
            session: self.session,
            receipt_timeout: self.receipt_timeout,
        };
        if !approval::ensure_allowance(&ops, spec.source, spec.spender, amount_base).await {
            return Err(EngineError::Approval {
                spender: spec.spender,
            });
        }

        let calldata = build_calldata(
            kind,
            network.encoding,
            &network.contracts,
            self.session.address,
            amount_base,
        );

        let hash = with_retry(self.retry, |attempt| {
            let calldata = calldata.clone();
            async move {
                if attempt > 1 {
                    debug!("resubmitting {kind} (attempt {attempt})");
                }
                self.submit(spec.spender, calldata, fee).await
            }
        })
        .await?;

        let post_balances = PostBalances {
            source: balances::token_balance_display(self.session, spec.source).await,
            target: balances::token_balance_display(self.session, spec.target).await,
        };

        Ok(ActionOutcome::Success {
            hash,
            explorer_url: network.explorer_tx_url(&format!("{hash}")),
            amount: amount_human,
            post_balances,
        })
    }

    async fn submit(
        &self,
        to: Address,
        calldata: Bytes,
        fee: FeePolicy,
    ) -> Result<TxHash, EngineError> {
        let network = self.session.network;

        let mut tx = TransactionRequest::default()
            .with_from(self.session.address)
            .with_to(to)
            .with_input(calldata)
            .with_max_fee_per_gas(fee.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fee.max_priority_fee_per_gas);
        let gas_limit = fees::estimate_gas_limit(&self.session.provider, &tx).await;
        tx = tx.with_gas_limit(gas_limit);

        let pending = self
            .session
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| EngineError::Submission(e.to_string()))?;
        let hash = *pending.tx_hash();
        info!(
            "transaction sent: {}",
            network.explorer_tx_url(&format!("{hash}"))
        );

        let receipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| {
                EngineError::Confirmation(format!(
                    "{e}; transaction may still be pending, check {}",
                    network.explorer_tx_url(&format!("{hash}"))
                ))
            })?;
        if !receipt.status() {
            return Err(EngineError::Confirmation(format!(
                "transaction reverted, see {}",
                network.explorer_tx_url(&format!("{hash}"))
            )));
        }
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn contracts() -> ContractSet {
        networks::find("Sepolia").unwrap().contracts.clone()
    }

    #[test]
    fn test_auto_run_order() {
        let order = ActionKind::all();
        assert_eq!(order[0], ActionKind::SwapUsdcToR2usd);
        assert_eq!(order[1], ActionKind::SwapR2usdToUsdc);
        assert_eq!(order[2], ActionKind::StakeR2usd);
    }

    #[test]
    fn test_spec_wiring() {
        let c = contracts();
        let swap_in = spec_for(ActionKind::SwapUsdcToR2usd, &c);
        assert_eq!(swap_in.source, c.usdc);
        assert_eq!(swap_in.target, c.r2usd);
        assert_eq!(swap_in.spender, c.swap_in);

        let stake = spec_for(ActionKind::StakeR2usd, &c);
        assert_eq!(stake.source, c.r2usd);
        assert_eq!(stake.target, c.sr2usd);
        assert_eq!(stake.spender, c.stake);
    }

    #[test]
    fn test_selector_padded_swap_layout() {
        let c = contracts();
        let signer = Address::from([0xabu8; 20]);
        let amount = U256::from(1_500_000u64);
        let data = build_calldata(
            ActionKind::SwapUsdcToR2usd,
            CallEncoding::SelectorPadded,
            &c,
            signer,
            amount,
        );

        // selector + 7 static words
        assert_eq!(data.len(), 4 + 7 * 32);
        assert_eq!(&data[..4], c.swap_in_selector.as_slice());
        // word 0: signer, left-padded
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..36], signer.as_slice());
        // word 1: amount
        assert_eq!(&data[36..68], amount.to_be_bytes::<32>().as_slice());
        // words 2..6: zero-filled
        assert!(data[68..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_stake_is_selector_plus_padded_amount() {
        let c = contracts();
        let amount = U256::from(42u64);
        for encoding in [CallEncoding::SelectorPadded, CallEncoding::CanonicalExchange] {
            let data = build_calldata(
                ActionKind::StakeR2usd,
                encoding,
                &c,
                Address::from([0x01u8; 20]),
                amount,
            );
            assert_eq!(data.len(), 36);
            assert_eq!(&data[..4], c.stake_selector.as_slice());
            assert_eq!(&data[4..], amount.to_be_bytes::<32>().as_slice());
        }
    }

    #[test]
    fn test_canonical_exchange_encoding() {
        let c = contracts();
        let amount = U256::from(1_000_000u64);
        let data = build_calldata(
            ActionKind::SwapUsdcToR2usd,
            CallEncoding::CanonicalExchange,
            &c,
            Address::from([0x01u8; 20]),
            amount,
        );

        assert_eq!(&data[..4], [0x3d, 0xf0, 0x21, 0x24].as_slice());
        let call = ICurvePool::exchangeCall::abi_decode(&data).unwrap();
        assert_eq!(call.i, 0);
        assert_eq!(call.j, 1);
        assert_eq!(call.dx, amount);
        // 3% slippage tolerance
        assert_eq!(call.min_dy, U256::from(970_000u64));
    }

    #[test]
    fn test_canonical_swap_out_reverses_indices() {
        let c = contracts();
        let data = build_calldata(
            ActionKind::SwapR2usdToUsdc,
            CallEncoding::CanonicalExchange,
            &c,
            Address::from([0x01u8; 20]),
            U256::from(500u64),
        );
        let call = ICurvePool::exchangeCall::abi_decode(&data).unwrap();
        assert_eq!(call.i, 1);
        assert_eq!(call.j, 0);
    }

    #[test]
    fn test_exchange_selector_matches_registry() {
        assert_eq!(ICurvePool::exchangeCall::SELECTOR, [0x3d, 0xf0, 0x21, 0x24]);
    }

    #[test]
    fn test_resolve_explicit_amount() {
        let mut rng = StdRng::seed_from_u64(7);
        let (base, human) = resolve_amount(Some(1.5), 6, &mut rng).unwrap();
        assert_eq!(base, U256::from(1_500_000u64));
        assert_eq!(human, "1.5");
    }

    #[test]
    fn test_resolve_random_amount_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let (base, _) = resolve_amount(None, 6, &mut rng).unwrap();
            assert!(base >= U256::from(100_000u64), "below 0.1: {base}");
            assert!(base <= U256::from(2_000_000u64), "above 2.0: {base}");
        }
    }

    #[test]
    fn test_spendable_precondition_fails_fast() {
        let err = ensure_spendable("USDC", U256::from(1_000_000u64), U256::from(1_500_000u64), 6)
            .unwrap_err();
        match err {
            EngineError::InsufficientBalance { symbol, have, need } => {
                assert_eq!(symbol, "USDC");
                assert_eq!(have, "1");
                assert_eq!(need, "1.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spendable_allows_exact_balance() {
        assert!(
            ensure_spendable("USDC", U256::from(1_500_000u64), U256::from(1_500_000u64), 6).is_ok()
        );
    }

    #[test]
    fn test_gas_budget_precondition() {
        let fee = FeePolicy::fallback();
        let worst = fee.worst_case_cost(fees::FALLBACK_GAS_LIMIT);
        assert!(ensure_gas_budget(worst, &fee).is_ok());
        assert!(matches!(
            ensure_gas_budget(worst - U256::from(1u64), &fee).unwrap_err(),
            EngineError::InsufficientGas { .. }
        ));
    }
}
