//! Network registry for the R2 testnet campaigns.
//!
//! Static description of every supported chain: candidate RPC endpoints,
//! explorer, token/contract addresses, and the call-encoding capability the
//! swap paths dispatch on. Loaded once, read-only for the process lifetime.

use alloy_primitives::Address;
use lazy_static::lazy_static;
use std::str::FromStr;

// ============================================
// CALL ENCODING CAPABILITY
// ============================================

/// How a network's swap entry points expect their calldata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEncoding {
    /// Non-standard entry point: fixed 4-byte selector followed by an
    /// ABI-encoded argument tuple with zero-filled trailing slots.
    SelectorPadded,

    /// Canonical stable-pool interface: `exchange(i, j, dx, min_dy)`.
    CanonicalExchange,
}

// ============================================
// CONTRACT SET
// ============================================

/// Token and contract addresses plus the selectors used on the
/// selector-padded encoding path.
#[derive(Debug, Clone)]
pub struct ContractSet {
    pub usdc: Address,
    pub r2usd: Address,
    pub sr2usd: Address,

    /// USDC -> R2USD entry point (and approval spender for swap-in).
    pub swap_in: Address,
    /// R2USD -> USDC entry point (and approval spender for swap-out).
    pub swap_out: Address,
    /// Staking contract (and approval spender for staking).
    pub stake: Address,

    pub swap_in_selector: [u8; 4],
    pub swap_out_selector: [u8; 4],
    pub stake_selector: [u8; 4],
}

// ============================================
// NETWORK DESCRIPTOR
// ============================================

#[derive(Debug, Clone)]
pub struct NetworkDescriptor {
    pub name: &'static str,
    pub chain_id: u64,
    /// Candidate RPC endpoints, tried in order. Invariant: at least one.
    pub rpc_urls: Vec<&'static str>,
    pub explorer: &'static str,
    /// Native currency symbol.
    pub symbol: &'static str,
    pub encoding: CallEncoding,
    pub contracts: ContractSet,
}

impl NetworkDescriptor {
    /// Human-followable reference for a submitted transaction hash.
    pub fn explorer_tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.explorer, hash)
    }
}

/// An account address usable as a call target: well-formed and non-zero.
pub fn is_valid_address(raw: &str) -> bool {
    match Address::from_str(raw) {
        Ok(addr) => addr != Address::ZERO,
        Err(_) => false,
    }
}

fn addr(raw: &str) -> Address {
    assert!(is_valid_address(raw), "registry address {raw} is invalid");
    Address::from_str(raw).expect("registry address is well-formed")
}

// ============================================
// SELECTORS
// ============================================

/// Sepolia/Plume USDC -> R2USD entry point.
const SWAP_IN_SELECTOR: [u8; 4] = [0x09, 0x5e, 0x7a, 0x95];
/// `exchange(int128,int128,uint256,uint256)`.
const EXCHANGE_SELECTOR: [u8; 4] = [0x3d, 0xf0, 0x21, 0x24];
/// Stake entry point, shared by all networks.
const STAKE_SELECTOR: [u8; 4] = [0x1a, 0x5f, 0x0f, 0x00];

// ============================================
// REGISTRY
// ============================================

fn sepolia() -> NetworkDescriptor {
    NetworkDescriptor {
        name: "Sepolia",
        chain_id: 11155111,
        rpc_urls: vec!["https://ethereum-sepolia-rpc.publicnode.com"],
        explorer: "https://sepolia.etherscan.io",
        symbol: "ETH",
        encoding: CallEncoding::SelectorPadded,
        contracts: ContractSet {
            usdc: addr("0xef84994ef411c4981328ffce5fda41cd3803fae4"),
            r2usd: addr("0x20c54c5f742f123abb49a982bfe0af47edb38756"),
            sr2usd: addr("0xbd6b25c4132f09369c354bee0f7be777d7d434fa"),
            swap_in: addr("0x20c54c5f742f123abb49a982bfe0af47edb38756"),
            swap_out: addr("0x07abd582df3d3472aa687a0489729f9f0424b1e3"),
            stake: addr("0xbd6b25c4132f09369c354bee0f7be777d7d434fa"),
            swap_in_selector: SWAP_IN_SELECTOR,
            swap_out_selector: EXCHANGE_SELECTOR,
            stake_selector: STAKE_SELECTOR,
        },
    }
}

fn arbitrum_sepolia() -> NetworkDescriptor {
    NetworkDescriptor {
        name: "Arbitrum Sepolia",
        chain_id: 421614,
        rpc_urls: vec!["https://arbitrum-sepolia.drpc.org"],
        explorer: "https://sepolia.arbiscan.io",
        symbol: "ETH",
        encoding: CallEncoding::CanonicalExchange,
        contracts: ContractSet {
            usdc: addr("0xef84994ef411c4981328ffce5fda41cd3803fae4"),
            r2usd: addr("0x20c54c5f742f123abb49a982bfe0af47edb38756"),
            sr2usd: addr("0x6b9573b7db7fb98ff4014ca8e71f57ab7b7ffdfb"),
            swap_in: addr("0xcce6bfca2558c15bb5faea7479a706735aef9634"),
            swap_out: addr("0xcce6bfca2558c15bb5faea7479a706735aef9634"),
            stake: addr("0x6b9573b7db7fb98ff4014ca8e71f57ab7b7ffdfb"),
            swap_in_selector: EXCHANGE_SELECTOR,
            swap_out_selector: EXCHANGE_SELECTOR,
            stake_selector: STAKE_SELECTOR,
        },
    }
}

fn plume_testnet() -> NetworkDescriptor {
    NetworkDescriptor {
        name: "Plume Testnet",
        chain_id: 98867,
        rpc_urls: vec![
            "https://testnet-rpc.plumenetwork.xyz",
            "https://rpc.testnet.plumenetwork.xyz",
        ],
        explorer: "https://testnet-explorer.plumenetwork.xyz",
        symbol: "ETH",
        encoding: CallEncoding::SelectorPadded,
        contracts: ContractSet {
            usdc: addr("0xef84994ef411c4981328ffce5fda41cd3803fae4"),
            r2usd: addr("0x20c54c5f742f123abb49a982bfe0af47edb38756"),
            sr2usd: addr("0xbd6b25c4132f09369c354bee0f7be777d7d434fa"),
            swap_in: addr("0x20c54c5f742f123abb49a982bfe0af47edb38756"),
            swap_out: addr("0x07abd582df3d3472aa687a0489729f9f0424b1e3"),
            stake: addr("0xbd6b25c4132f09369c354bee0f7be777d7d434fa"),
            swap_in_selector: SWAP_IN_SELECTOR,
            swap_out_selector: EXCHANGE_SELECTOR,
            stake_selector: STAKE_SELECTOR,
        },
    }
}

lazy_static! {
    /// All supported networks, in default processing order.
    pub static ref NETWORKS: Vec<NetworkDescriptor> =
        vec![sepolia(), arbitrum_sepolia(), plume_testnet()];
}

/// Look up a network by name, case-insensitive.
pub fn find(name: &str) -> Option<&'static NetworkDescriptor> {
    NETWORKS
        .iter()
        .find(|n| n.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_network_has_an_rpc_candidate() {
        for network in NETWORKS.iter() {
            assert!(
                !network.rpc_urls.is_empty(),
                "{} has no RPC endpoints",
                network.name
            );
        }
    }

    #[test]
    fn test_chain_ids_are_unique() {
        let mut ids: Vec<u64> = NETWORKS.iter().map(|n| n.chain_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), NETWORKS.len());
    }

    #[test]
    fn test_registry_addresses_are_usable() {
        for network in NETWORKS.iter() {
            let c = &network.contracts;
            for address in [c.usdc, c.r2usd, c.sr2usd, c.swap_in, c.swap_out, c.stake] {
                assert_ne!(address, Address::ZERO, "zero address in {}", network.name);
            }
        }
    }

    #[test]
    fn test_explorer_tx_url_format() {
        let sepolia = find("sepolia").unwrap();
        assert_eq!(
            sepolia.explorer_tx_url("0xabc123"),
            "https://sepolia.etherscan.io/tx/0xabc123"
        );
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address(
            "0xef84994ef411c4981328ffce5fda41cd3803fae4"
        ));
        assert!(!is_valid_address(
            "0x0000000000000000000000000000000000000000"
        ));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("not an address"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert!(find("SEPOLIA").is_some());
        assert!(find("arbitrum sepolia").is_some());
        assert!(find(" Plume Testnet ").is_some());
        assert!(find("mainnet").is_none());
    }
}
