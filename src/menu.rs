//! Interactive selection boundary.
//!
//! A thin stdin/console layer that turns menu input into a [`RunMode`] and
//! network scope for the orchestrator. Invalid input re-prompts through the
//! loop below - menu handlers never call back into themselves.

use crate::executor::ActionKind;
use crate::networks::{self, NetworkDescriptor};
use crate::orchestrator::RunMode;
use console::style;
use eyre::Result;
use std::io::{self, Write};

pub struct Selection {
    pub mode: RunMode,
    pub networks: Vec<&'static NetworkDescriptor>,
}

pub enum MenuChoice {
    Run(Selection),
    Exit,
}

pub fn show_menu() -> Result<MenuChoice> {
    loop {
        println!();
        println!(
            "{}",
            style("========== R2 RUNNER MENU ==========").white().bold()
        );
        println!("{}", style("1. Swaps and staking (manual)").yellow());
        println!("{}", style("2. Auto run all").yellow());
        println!(
            "{}",
            style("3. Random amount auto run (0.1-2.0)").yellow()
        );
        println!("{}", style("4. Exit").yellow());
        println!("{}", style("====================================").white());

        let choice = prompt("Select an option (1-4): ")?;
        match choice.trim() {
            "1" => {
                let action = select_action()?;
                let amount = read_amount()?;
                let count = read_count()?;
                let networks = select_networks()?;
                return Ok(MenuChoice::Run(Selection {
                    mode: RunMode::Manual {
                        action,
                        amount,
                        count,
                    },
                    networks,
                }));
            }
            "2" => {
                let count = read_count()?;
                return Ok(MenuChoice::Run(Selection {
                    mode: RunMode::AutoRunAll { count },
                    networks: all_networks(),
                }));
            }
            "3" => {
                let count = read_count()?;
                return Ok(MenuChoice::Run(Selection {
                    mode: RunMode::RandomAuto { count },
                    networks: all_networks(),
                }));
            }
            "4" => return Ok(MenuChoice::Exit),
            _ => println!("{}", style("Invalid option. Please select 1-4.").red()),
        }
    }
}

fn all_networks() -> Vec<&'static NetworkDescriptor> {
    networks::NETWORKS.iter().collect()
}

fn select_action() -> Result<ActionKind> {
    loop {
        println!("{}", style("1. USDC to R2USD swap").yellow());
        println!("{}", style("2. R2USD to USDC swap").yellow());
        println!("{}", style("3. Stake R2USD").yellow());
        let input = prompt("Select an action (1-3): ")?;
        match input.trim() {
            "1" => return Ok(ActionKind::SwapUsdcToR2usd),
            "2" => return Ok(ActionKind::SwapR2usdToUsdc),
            "3" => return Ok(ActionKind::StakeR2usd),
            _ => println!("{}", style("Invalid action. Please select 1-3.").red()),
        }
    }
}

fn select_networks() -> Result<Vec<&'static NetworkDescriptor>> {
    println!("{}", style("Available networks:").white());
    for (i, network) in networks::NETWORKS.iter().enumerate() {
        println!("{}", style(format!("{}. {}", i + 1, network.name)).yellow());
    }
    let input = prompt("Select network number (or \"all\" for all networks): ")?;
    match parse_scope_choice(&input, networks::NETWORKS.len()) {
        Some(ScopeChoice::All) => Ok(all_networks()),
        Some(ScopeChoice::One(index)) => Ok(vec![&networks::NETWORKS[index]]),
        None => {
            println!(
                "{}",
                style("Invalid selection. Using first network.").yellow()
            );
            Ok(vec![&networks::NETWORKS[0]])
        }
    }
}

fn read_count() -> Result<u32> {
    loop {
        let input = prompt("Enter number of transactions: ")?;
        match parse_count(&input) {
            Some(count) => return Ok(count),
            None => println!(
                "{}",
                style("Invalid number. Enter a positive integer.").red()
            ),
        }
    }
}

fn read_amount() -> Result<Option<f64>> {
    loop {
        let input = prompt("Enter amount (or \"random\"): ")?;
        match parse_amount(&input) {
            Some(amount) => return Ok(amount),
            None => println!(
                "{}",
                style("Invalid amount. Enter a positive number or \"random\".").red()
            ),
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", style(message).yellow());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// ============================================
// PURE PARSERS
// ============================================

pub(crate) enum ScopeChoice {
    All,
    One(usize),
}

pub(crate) fn parse_scope_choice(input: &str, len: usize) -> Option<ScopeChoice> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Some(ScopeChoice::All);
    }
    let index: usize = trimmed.parse().ok()?;
    if (1..=len).contains(&index) {
        Some(ScopeChoice::One(index - 1))
    } else {
        None
    }
}

pub(crate) fn parse_count(input: &str) -> Option<u32> {
    let count: u32 = input.trim().parse().ok()?;
    (count > 0).then_some(count)
}

/// `None` in the outer `Option` means unparseable; `Some(None)` means a
/// random amount per transaction.
pub(crate) fn parse_amount(input: &str) -> Option<Option<f64>> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("random") || trimmed.is_empty() {
        return Some(None);
    }
    let amount: f64 = trimmed.parse().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(Some(amount))
}
