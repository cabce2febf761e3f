//! R2 Runner - automated swap and staking bot for R2 testnet campaigns
//!
//! Run with: cargo run
//!
//! Wallets come from `PRIVATE_KEY_*` entries in `.env`, proxies from
//! `proxies.txt` (optional), and the run mode from the interactive menu or
//! the `--mode` flag. Once a mode is selected the orchestrator loops over
//! networks x wallets x transactions until the process is terminated.

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod amounts;
mod config;
mod errors;
mod executor;
mod menu;
mod networks;
mod orchestrator;
mod proxy;
mod retry;
mod session;
mod txlog;

use config::Config;
use executor::{balances, ActionKind};
use menu::{MenuChoice, Selection};
use orchestrator::{Orchestrator, RunMode, RunScope};
use proxy::ProxyPool;
use session::WalletSession;

#[derive(Parser, Debug)]
#[command(name = "r2runner", about = "Automated swap and staking runner for R2 testnet campaigns")]
struct Args {
    /// TOML config file; defaults to environment variables + .env
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run mode: manual | auto | random (skips the interactive menu)
    #[arg(long)]
    mode: Option<String>,

    /// Action for manual mode: swap-in | swap-out | stake
    #[arg(long)]
    action: Option<String>,

    /// Transactions per wallet (per action in auto mode); defaults to 1
    #[arg(long)]
    count: Option<u32>,

    /// Fixed amount in token units for manual mode; omit for random draws
    #[arg(long)]
    amount: Option<f64>,

    /// Restrict the run to one network by name
    #[arg(long)]
    network: Option<String>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" R2 RUNNER - Swap & Staking Automation").cyan().bold()
    );
    println!(
        "{}",
        style("    3 Testnets | RPC Failover | Proxy Rotation").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

async fn print_wallet_balances(wallet: &WalletSession) {
    let contracts = &wallet.network.contracts;
    let native = balances::native_balance_display(wallet).await;
    let usdc = balances::token_balance_display(wallet, contracts.usdc).await;
    let r2usd = balances::token_balance_display(wallet, contracts.r2usd).await;
    let sr2usd = balances::token_balance_display(wallet, contracts.sr2usd).await;
    println!(
        "   {}: {native}  USDC: {usdc}  R2USD: {r2usd}  sR2USD: {sr2usd}",
        wallet.network.symbol
    );
}

/// Build a run selection from CLI flags, or `None` to fall back to the menu.
fn selection_from_args(args: &Args) -> Result<Option<Selection>> {
    let scope_networks = match &args.network {
        Some(name) => {
            vec![networks::find(name).ok_or_else(|| eyre!("unknown network: {name}"))?]
        }
        None => networks::NETWORKS.iter().collect(),
    };

    let Some(mode) = &args.mode else {
        return Ok(None);
    };
    let count = args.count.unwrap_or(1);
    if count == 0 {
        return Err(eyre!("--count must be a positive integer"));
    }
    if let Some(amount) = args.amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(eyre!("--amount must be a positive number"));
        }
    }

    let mode = match mode.as_str() {
        "manual" => {
            let action = match args.action.as_deref() {
                Some("swap-in") => ActionKind::SwapUsdcToR2usd,
                Some("swap-out") => ActionKind::SwapR2usdToUsdc,
                Some("stake") => ActionKind::StakeR2usd,
                Some(other) => {
                    return Err(eyre!(
                        "unknown action: {other} (expected swap-in, swap-out, or stake)"
                    ))
                }
                None => return Err(eyre!("--mode manual requires --action")),
            };
            RunMode::Manual {
                action,
                amount: args.amount,
                count,
            }
        }
        "auto" => RunMode::AutoRunAll { count },
        "random" => RunMode::RandomAuto { count },
        other => return Err(eyre!("unknown mode: {other} (expected manual, auto, or random)")),
    };

    Ok(Some(Selection {
        mode,
        networks: scope_networks,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("r2runner=info".parse()?),
        )
        .init();

    print_banner();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    println!(
        "{} Loaded {} private key(s), pacing {}-{}s, {} submission attempts",
        style("✓").green(),
        config.private_keys.len(),
        config.pace_min_secs,
        config.pace_max_secs,
        config.retry_attempts
    );

    let proxies = ProxyPool::load(&config.proxies_path);
    if !proxies.is_empty() {
        println!("{} Proxy pool: {} entries", style("✓").green(), proxies.len());
    }

    // Bind every key against the default network once. Keys that cannot
    // connect are dropped from the run; zero usable wallets is fatal.
    let default_network = &networks::NETWORKS[0];
    let mut usable_keys = Vec::new();
    for key in &config.private_keys {
        let bar = spinner(format!("Connecting to {}...", default_network.name));
        match session::connect(key, default_network, &proxies).await {
            Ok((wallet, report)) => {
                bar.finish_and_clear();
                for attempt in &report.attempts {
                    if let Some(error) = &attempt.error {
                        println!(
                            "{} RPC {} failed: {error}",
                            style("!").yellow(),
                            attempt.url
                        );
                    }
                }
                println!(
                    "{} Wallet {} on {} via {}",
                    style("✓").green(),
                    wallet.short_address(),
                    default_network.name,
                    report.endpoint.unwrap_or_default()
                );
                if let Some(proxy) = &report.proxy {
                    println!("   proxy: {proxy}");
                }
                print_wallet_balances(&wallet).await;
                usable_keys.push(key.clone());
            }
            Err(e) => {
                bar.finish_and_clear();
                println!("{} {e}", style("✗").red());
            }
        }
    }
    if usable_keys.is_empty() {
        return Err(eyre!("no valid wallets initialized, exiting"));
    }

    let mut selection = match selection_from_args(&args)? {
        Some(selection) => selection,
        None => match menu::show_menu()? {
            MenuChoice::Run(selection) => selection,
            MenuChoice::Exit => {
                println!("{}", style("Exiting application...").dim());
                return Ok(());
            }
        },
    };
    // A --network flag narrows the scope regardless of how the mode was chosen.
    if let Some(name) = &args.network {
        selection.networks =
            vec![networks::find(name).ok_or_else(|| eyre!("unknown network: {name}"))?];
    }

    let scope = RunScope {
        networks: selection.networks,
        keys: usable_keys,
    };
    let orchestrator = Orchestrator::new(config, proxies, scope);
    orchestrator.run(selection.mode).await;

    Ok(())
}
