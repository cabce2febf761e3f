//! Wallet/provider binding with RPC failover and optional proxying.
//!
//! A [`WalletSession`] is created per wallet x network pair and rebound
//! whenever the active network changes. Candidate RPC endpoints are tried
//! in descriptor order, each attempt optionally routed through one proxy
//! chosen at random from the pool; the first endpoint that answers
//! `eth_chainId` with the expected value wins and later candidates are
//! never dialed.

use crate::config::is_valid_private_key;
use crate::errors::EngineError;
use crate::networks::NetworkDescriptor;
use crate::proxy::{ProxyDescriptor, ProxyPool};
use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connect timeout for a single endpoint probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Render a sensitive identifier as `prefix..suffix` for logs.
pub fn truncated(id: &str) -> String {
    if id.len() <= 12 {
        return id.to_string();
    }
    format!("{}..{}", &id[..6], &id[id.len() - 4..])
}

// ============================================
// SESSION
// ============================================

/// A signing wallet bound to a live provider on one network.
#[derive(Debug)]
pub struct WalletSession {
    pub address: Address,
    pub provider: DynProvider,
    pub network: &'static NetworkDescriptor,
    /// The endpoint that won the failover race.
    pub rpc_url: String,
}

impl WalletSession {
    pub fn short_address(&self) -> String {
        truncated(&format!("{:?}", self.address))
    }
}

// ============================================
// CONNECTION REPORT
// ============================================

/// Structured record of a connection attempt, returned so the UI boundary
/// can render progress without the engine owning any rendering.
#[derive(Debug, Default)]
pub struct ConnectionReport {
    pub attempts: Vec<EndpointAttempt>,
    pub endpoint: Option<String>,
    pub proxy: Option<String>,
}

#[derive(Debug)]
pub struct EndpointAttempt {
    pub url: String,
    /// `None` for the winning endpoint.
    pub error: Option<String>,
}

// ============================================
// CONNECT
// ============================================

/// Bind a private key to a working provider for `network`.
///
/// Fails only when the key is unusable or every RPC candidate was
/// exhausted; the caller decides whether to skip the wallet/network pair.
pub async fn connect(
    private_key: &str,
    network: &'static NetworkDescriptor,
    proxies: &ProxyPool,
) -> Result<(WalletSession, ConnectionReport), EngineError> {
    if !is_valid_private_key(private_key) {
        return Err(EngineError::Validation(format!(
            "private key {} is not 64 hex digits",
            truncated(private_key)
        )));
    }
    let signer = PrivateKeySigner::from_str(private_key.trim_start_matches("0x")).map_err(|e| {
        EngineError::Validation(format!(
            "unusable private key {}: {e}",
            truncated(private_key)
        ))
    })?;
    let address = signer.address();
    let wallet = EthereumWallet::from(signer);

    let proxy = proxies.pick().cloned();
    if let Some(ref p) = proxy {
        debug!("routing {} connection through proxy {p}", network.name);
    }

    let (provider, mut report) = try_endpoints(network, |url| {
        let wallet = wallet.clone();
        let proxy = proxy.clone();
        async move { probe_endpoint(url, wallet, proxy.as_ref(), network.chain_id).await }
    })
    .await?;
    report.proxy = proxy.map(|p| p.to_string());

    let session = WalletSession {
        address,
        provider,
        network,
        rpc_url: report.endpoint.clone().unwrap_or_default(),
    };
    info!(
        "wallet {} initialized on {} via {}",
        session.short_address(),
        network.name,
        session.rpc_url
    );
    Ok((session, report))
}

/// Try each candidate endpoint in order, accepting the first success. The
/// probe is injected so failover is testable without a live node.
pub(crate) async fn try_endpoints<T, F, Fut>(
    network: &NetworkDescriptor,
    mut probe: F,
) -> Result<(T, ConnectionReport), EngineError>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut report = ConnectionReport::default();
    let mut last_error = "no RPC endpoints configured".to_string();

    for &url in &network.rpc_urls {
        match probe(url).await {
            Ok(value) => {
                report.attempts.push(EndpointAttempt {
                    url: url.to_string(),
                    error: None,
                });
                report.endpoint = Some(url.to_string());
                return Ok((value, report));
            }
            Err(e) => {
                warn!("RPC {url} failed on {}: {e}", network.name);
                report.attempts.push(EndpointAttempt {
                    url: url.to_string(),
                    error: Some(e.clone()),
                });
                last_error = e;
            }
        }
    }

    Err(EngineError::Connection {
        network: network.name.to_string(),
        last_error,
    })
}

/// Build a provider for one endpoint and confirm liveness via `eth_chainId`.
async fn probe_endpoint(
    url: &str,
    wallet: EthereumWallet,
    proxy: Option<&ProxyDescriptor>,
    expected_chain_id: u64,
) -> Result<DynProvider, String> {
    let parsed: reqwest::Url = url.parse().map_err(|e| format!("bad RPC url: {e}"))?;

    let provider = match proxy {
        Some(descriptor) => {
            let mut upstream = reqwest::Proxy::all(descriptor.url())
                .map_err(|e| format!("bad proxy {descriptor}: {e}"))?;
            if let Some((user, pass)) = &descriptor.auth {
                upstream = upstream.basic_auth(user, pass);
            }
            let client = reqwest::Client::builder()
                .proxy(upstream)
                .timeout(PROBE_TIMEOUT)
                .build()
                .map_err(|e| format!("http client build failed: {e}"))?;
            let transport = Http::with_client(client, parsed);
            let rpc = RpcClient::new(transport, false);
            ProviderBuilder::new().wallet(wallet).connect_client(rpc).erased()
        }
        None => ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(parsed)
            .erased(),
    };

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| format!("chain id query failed: {e}"))?;
    if chain_id != expected_chain_id {
        return Err(format!(
            "chain id mismatch: got {chain_id}, expected {expected_chain_id}"
        ));
    }
    Ok(provider)
}
