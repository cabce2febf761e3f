//! Balance and allowance reads used as transaction preconditions.
//!
//! Reads come in two flavors. The `Result`-returning functions report RPC
//! failures so callers can tell a real zero from a failed read; the
//! `*_or_zero` / `*_display` adapters implement the advisory policy that a
//! failed read renders as zero (or `N/A`) and never aborts a workflow.

use crate::amounts;
use crate::errors::EngineError;
use crate::session::WalletSession;
use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use tracing::warn;

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Assumed when a `decimals()` read fails; every R2 campaign token uses 6.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 6;

fn usable(token: Address) -> Result<(), EngineError> {
    if token == Address::ZERO {
        return Err(EngineError::Validation(
            "token address is the zero address".to_string(),
        ));
    }
    Ok(())
}

async fn read_call<C: SolCall>(
    session: &WalletSession,
    target: Address,
    call: C,
) -> Result<C::Return, EngineError> {
    let tx = TransactionRequest::default()
        .with_to(target)
        .with_input(call.abi_encode());
    let raw = session
        .provider
        .call(tx)
        .await
        .map_err(|e| EngineError::Submission(format!("read call failed: {e}")))?;
    C::abi_decode_returns(&raw)
        .map_err(|e| EngineError::Submission(format!("read call returned garbage: {e}")))
}

// ============================================
// NATIVE BALANCE
// ============================================

pub async fn native_balance(session: &WalletSession) -> Result<U256, EngineError> {
    session
        .provider
        .get_balance(session.address)
        .await
        .map_err(|e| EngineError::Submission(format!("native balance read failed: {e}")))
}

/// Native balance in ether units; a failed read renders as `"0"`.
pub async fn native_balance_display(session: &WalletSession) -> String {
    match native_balance(session).await {
        Ok(balance) => amounts::from_base_units(balance, 18),
        Err(e) => {
            warn!("failed to check native balance: {e}");
            "0".to_string()
        }
    }
}

// ============================================
// TOKEN READS
// ============================================

pub async fn token_balance(session: &WalletSession, token: Address) -> Result<U256, EngineError> {
    usable(token)?;
    read_call(
        session,
        token,
        IERC20::balanceOfCall {
            account: session.address,
        },
    )
    .await
}

/// Advisory adapter: a failed read is treated as a zero balance.
pub async fn token_balance_or_zero(session: &WalletSession, token: Address) -> U256 {
    match token_balance(session, token).await {
        Ok(balance) => balance,
        Err(e) => {
            warn!("treating failed balance read as zero: {e}");
            U256::ZERO
        }
    }
}

pub async fn token_decimals(session: &WalletSession, token: Address) -> Result<u8, EngineError> {
    usable(token)?;
    read_call(session, token, IERC20::decimalsCall {}).await
}

pub async fn token_decimals_or_default(session: &WalletSession, token: Address) -> u8 {
    match token_decimals(session, token).await {
        Ok(decimals) => decimals,
        Err(e) => {
            warn!("failed to read decimals, assuming {DEFAULT_TOKEN_DECIMALS}: {e}");
            DEFAULT_TOKEN_DECIMALS
        }
    }
}

/// Human-unit balance string for display. Invalid addresses short-circuit
/// to `"N/A"` without any RPC call; read failures render as `"0"`.
pub async fn token_balance_display(session: &WalletSession, token: Address) -> String {
    if token == Address::ZERO {
        return "N/A".to_string();
    }
    let decimals = token_decimals_or_default(session, token).await;
    match token_balance(session, token).await {
        Ok(balance) => amounts::from_base_units(balance, decimals),
        Err(e) => {
            warn!("failed to check balance for token {token}: {e}");
            "0".to_string()
        }
    }
}

// ============================================
// ALLOWANCE
// ============================================

/// Current spender allowance, in smallest units.
pub async fn allowance(
    session: &WalletSession,
    token: Address,
    spender: Address,
) -> Result<U256, EngineError> {
    usable(token)?;
    usable(spender)?;
    read_call(
        session,
        token,
        IERC20::allowanceCall {
            owner: session.address,
            spender,
        },
    )
    .await
}
