//! Cycle orchestration across networks, wallets, and transaction counts.
//!
//! A single dispatch loop drives an explicit state machine:
//! `NextNetwork -> NextWallet -> NextTransaction -> Pacing -> ... ->
//! CycleComplete -> LongPause -> NextNetwork`. No recursion, no unbounded
//! call stack; the cycle restarts after the long pause and only process
//! termination stops it.

use crate::config::Config;
use crate::executor::{ActionExecutor, ActionKind, ActionOutcome};
use crate::networks::NetworkDescriptor;
use crate::proxy::ProxyPool;
use crate::retry::pace;
use crate::session::{self, WalletSession};
use crate::txlog::{self, TxRecord};
use chrono::Utc;
use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

// ============================================
// RUN MODES
// ============================================

#[derive(Debug, Clone)]
pub enum RunMode {
    /// One explicit action, fixed or random amount, repeated `count` times.
    Manual {
        action: ActionKind,
        amount: Option<f64>,
        count: u32,
    },
    /// Swap in, swap out, and stake sequentially, `count` of each.
    AutoRunAll { count: u32 },
    /// `count` transactions, each a uniformly random action and amount.
    RandomAuto { count: u32 },
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Manual { action, .. } => write!(f, "manual ({action})"),
            RunMode::AutoRunAll { .. } => write!(f, "auto-run-all"),
            RunMode::RandomAuto { .. } => write!(f, "random-amount auto-run"),
        }
    }
}

/// The networks and wallets a run iterates over, fixed at selection time.
#[derive(Debug, Clone)]
pub struct RunScope {
    pub networks: Vec<&'static NetworkDescriptor>,
    pub keys: Vec<String>,
}

// ============================================
// SCHEDULE
// ============================================

#[derive(Debug, Clone, Copy)]
pub struct ScheduledAction {
    pub action: ActionKind,
    pub amount: Option<f64>,
    /// 1-based position within its group, for progress lines.
    pub index: u32,
    pub total: u32,
}

/// Per-wallet transaction plan. A failure halts the rest of the current
/// group when `halt_group_on_failure` is set: a sustained failure (usually
/// exhausted funds) makes repeating the same action wasteful, while the
/// random mode keeps going since the next draw may be a different action.
#[derive(Debug)]
pub struct Schedule {
    pub groups: Vec<Vec<ScheduledAction>>,
    pub halt_group_on_failure: bool,
}

pub(crate) fn build_schedule(mode: &RunMode, rng: &mut impl Rng) -> Schedule {
    match mode {
        RunMode::Manual {
            action,
            amount,
            count,
        } => Schedule {
            groups: vec![numbered(*action, *amount, *count)],
            halt_group_on_failure: true,
        },
        RunMode::AutoRunAll { count } => Schedule {
            groups: ActionKind::all()
                .iter()
                .map(|action| numbered(*action, None, *count))
                .collect(),
            halt_group_on_failure: true,
        },
        RunMode::RandomAuto { count } => {
            let all = ActionKind::all();
            Schedule {
                groups: vec![(1..=*count)
                    .map(|index| ScheduledAction {
                        action: all[rng.gen_range(0..all.len())],
                        amount: None,
                        index,
                        total: *count,
                    })
                    .collect()],
                halt_group_on_failure: false,
            }
        }
    }
}

fn numbered(action: ActionKind, amount: Option<f64>, count: u32) -> Vec<ScheduledAction> {
    (1..=count)
        .map(|index| ScheduledAction {
            action,
            amount,
            index,
            total: count,
        })
        .collect()
}

fn has_remaining(schedule: &Schedule, mut group: usize, mut item: usize) -> bool {
    while group < schedule.groups.len() {
        if item < schedule.groups[group].len() {
            return true;
        }
        group += 1;
        item = 0;
    }
    false
}

// ============================================
// STATE MACHINE
// ============================================

struct WalletRun {
    session: WalletSession,
    schedule: Schedule,
    group: usize,
    item: usize,
}

enum CycleState {
    NextNetwork(usize),
    NextWallet {
        network: usize,
        wallet: usize,
    },
    NextTransaction {
        network: usize,
        wallet: usize,
        run: Box<WalletRun>,
    },
    Pacing {
        network: usize,
        wallet: usize,
        run: Box<WalletRun>,
    },
    CycleComplete,
    LongPause,
}

pub struct Orchestrator {
    config: Config,
    proxies: ProxyPool,
    scope: RunScope,
}

impl Orchestrator {
    pub fn new(config: Config, proxies: ProxyPool, scope: RunScope) -> Self {
        Self {
            config,
            proxies,
            scope,
        }
    }

    /// Run the cycle indefinitely. Only process termination stops it.
    pub async fn run(&self, mode: RunMode) {
        info!(
            "starting {mode} cycle over {} network(s) x {} wallet(s)",
            self.scope.networks.len(),
            self.scope.keys.len()
        );
        let mut state = CycleState::NextNetwork(0);
        loop {
            state = self.step(state, &mode).await;
        }
    }

    async fn step(&self, state: CycleState, mode: &RunMode) -> CycleState {
        match state {
            CycleState::NextNetwork(network) => {
                if network >= self.scope.networks.len() {
                    return CycleState::CycleComplete;
                }
                info!("processing network: {}", self.scope.networks[network].name);
                CycleState::NextWallet { network, wallet: 0 }
            }

            CycleState::NextWallet { network, wallet } => {
                if wallet >= self.scope.keys.len() {
                    return CycleState::NextNetwork(network + 1);
                }
                let descriptor = self.scope.networks[network];
                match session::connect(&self.scope.keys[wallet], descriptor, &self.proxies).await {
                    Ok((session, _report)) => {
                        info!(
                            "processing wallet {} on {}",
                            session.short_address(),
                            descriptor.name
                        );
                        let schedule = build_schedule(mode, &mut rand::thread_rng());
                        CycleState::NextTransaction {
                            network,
                            wallet,
                            run: Box::new(WalletRun {
                                session,
                                schedule,
                                group: 0,
                                item: 0,
                            }),
                        }
                    }
                    Err(e) => {
                        warn!(
                            "skipping wallet {} on {}: {e}",
                            wallet + 1,
                            descriptor.name
                        );
                        CycleState::NextWallet {
                            network,
                            wallet: wallet + 1,
                        }
                    }
                }
            }

            CycleState::NextTransaction {
                network,
                wallet,
                mut run,
            } => {
                while run.group < run.schedule.groups.len()
                    && run.item >= run.schedule.groups[run.group].len()
                {
                    run.group += 1;
                    run.item = 0;
                }
                if run.group >= run.schedule.groups.len() {
                    info!(
                        "completed all transactions for wallet {}",
                        run.session.short_address()
                    );
                    return CycleState::NextWallet {
                        network,
                        wallet: wallet + 1,
                    };
                }

                let item = run.schedule.groups[run.group][run.item];
                info!("transaction {}/{}: {}", item.index, item.total, item.action);

                let outcome = {
                    let executor = ActionExecutor::new(
                        &run.session,
                        self.config.retry_policy(),
                        self.config.receipt_timeout(),
                    );
                    executor.execute(item.action, item.amount).await
                };
                self.record(&run.session, item.action, &outcome);

                match &outcome {
                    ActionOutcome::Success {
                        amount,
                        explorer_url,
                        post_balances,
                        ..
                    } => {
                        info!("{} of {amount} confirmed: {explorer_url}", item.action);
                        info!(
                            "post-transaction balances: {} -> {}",
                            post_balances.source, post_balances.target
                        );
                        run.item += 1;
                    }
                    ActionOutcome::Failure { error } => {
                        warn!("transaction {}/{} failed: {error}", item.index, item.total);
                        if error.is_funds_exhaustion() {
                            warn!(
                                "wallet {} looks out of funds for this action",
                                run.session.short_address()
                            );
                        }
                        if run.schedule.halt_group_on_failure {
                            run.group += 1;
                            run.item = 0;
                        } else {
                            run.item += 1;
                        }
                    }
                }
                CycleState::Pacing {
                    network,
                    wallet,
                    run,
                }
            }

            CycleState::Pacing {
                network,
                wallet,
                run,
            } => {
                if has_remaining(&run.schedule, run.group, run.item) {
                    let (min, max) = self.config.pace_bounds();
                    pace(min, max).await;
                }
                CycleState::NextTransaction {
                    network,
                    wallet,
                    run,
                }
            }

            CycleState::CycleComplete => {
                info!(
                    "all networks processed, pausing for {} hour(s) before the next cycle",
                    self.config.cycle_pause_hours
                );
                CycleState::LongPause
            }

            CycleState::LongPause => {
                sleep(self.config.cycle_pause()).await;
                info!("restarting cycle");
                CycleState::NextNetwork(0)
            }
        }
    }

    fn record(&self, session: &WalletSession, action: ActionKind, outcome: &ActionOutcome) {
        let success = outcome.is_success();
        let record = match outcome {
            ActionOutcome::Success {
                hash,
                explorer_url,
                amount,
                ..
            } => TxRecord {
                timestamp: Utc::now(),
                network: session.network.name.to_string(),
                wallet: session.short_address(),
                action: action.to_string(),
                amount: Some(amount.clone()),
                tx_hash: Some(format!("{hash}")),
                explorer_url: Some(explorer_url.clone()),
                success,
                failure_reason: None,
            },
            ActionOutcome::Failure { error } => TxRecord {
                timestamp: Utc::now(),
                network: session.network.name.to_string(),
                wallet: session.short_address(),
                action: action.to_string(),
                amount: None,
                tx_hash: None,
                explorer_url: None,
                success,
                failure_reason: Some(error.to_string()),
            },
        };
        txlog::record(&self.config.run_log_path, &record);
    }
}
