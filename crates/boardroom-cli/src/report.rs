//! Final-state summary of a scenario run

use std::collections::BTreeMap;

use boardroom_core::{BlockNumber, Timestamp};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub time: Timestamp,
    pub block: BlockNumber,
    pub decimals: u32,
    pub steps: Vec<StepOutcome>,
    pub ledger: LedgerSummary,
    pub accounts: Vec<AccountSummary>,
    pub distributor: DistributorSummary,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub time: Timestamp,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerSummary {
    pub locked_supply: u128,
    pub voting_power: u128,
    pub epoch: usize,
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub label: String,
    pub id: String,
    pub locked: u128,
    pub unlock_time: Timestamp,
    pub voting_power: u128,

    /// Reward-token balances by symbol
    pub rewards: BTreeMap<String, u128>,
}

#[derive(Debug, Serialize)]
pub struct DistributorSummary {
    pub address: String,
    pub time_cursor: Timestamp,
    pub killed: bool,
    pub can_checkpoint_token: bool,
    pub tokens: Vec<TokenSummary>,
}

#[derive(Debug, Serialize)]
pub struct TokenSummary {
    pub symbol: String,
    pub registered: bool,
    pub start_time: Option<Timestamp>,
    pub last_token_time: Option<Timestamp>,
    pub last_balance: Option<u128>,

    /// Balance held by the distributor
    pub held: u128,

    /// Periods with attributed fees or a recorded supply
    pub periods: Vec<PeriodSummary>,
}

#[derive(Debug, Serialize)]
pub struct PeriodSummary {
    pub start: Timestamp,
    pub tokens: u128,
    pub ve_supply: u128,
}

/// Render base units with `decimals` places, dropping trailing zeros
pub fn format_units(amount: u128, decimals: u32) -> String {
    let Some(scale) = 10u128.checked_pow(decimals) else {
        return amount.to_string();
    };
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

pub fn print_table(report: &Report) {
    let units = |amount: u128| format_units(amount, report.decimals);

    println!("Boardroom at t={} (block {})", report.time, report.block);
    println!();

    println!("Steps:");
    println!("  {:>3}  {:<24} {:>12}  result", "#", "action", "time");
    for step in &report.steps {
        let status = if step.ok { "ok" } else { "FAILED" };
        println!(
            "  {:>3}  {:<24} {:>12}  {}: {}",
            step.index, step.action, step.time, status, step.detail
        );
    }
    println!();

    println!("Ledger:");
    println!("  Locked supply: {}", units(report.ledger.locked_supply));
    println!("  Voting power:  {}", units(report.ledger.voting_power));
    println!("  Epoch:         {}", report.ledger.epoch);
    println!();

    println!("Accounts:");
    for account in &report.accounts {
        println!("  {} ({}...)", account.label, &account.id[..16]);
        println!(
            "    locked {} until {}, power {}",
            units(account.locked),
            account.unlock_time,
            units(account.voting_power)
        );
        for (symbol, amount) in &account.rewards {
            println!("    {}: {}", symbol, units(*amount));
        }
    }
    println!();

    let distributor = &report.distributor;
    println!("Distributor ({}...):", &distributor.address[..16]);
    println!("  Time cursor:        {}", distributor.time_cursor);
    println!("  Killed:             {}", distributor.killed);
    println!("  Public checkpoints: {}", distributor.can_checkpoint_token);
    for token in &distributor.tokens {
        let state = if token.registered { "" } else { " (not registered)" };
        println!("  {}{}: holds {}", token.symbol, state, units(token.held));
        if let (Some(start), Some(last), Some(balance)) =
            (token.start_time, token.last_token_time, token.last_balance)
        {
            println!(
                "    start {}, last checkpoint {}, tracked balance {}",
                start,
                last,
                units(balance)
            );
        }
        for period in &token.periods {
            println!(
                "    period {:>12}  fees {:>24}  supply {}",
                period.start,
                units(period.tokens),
                units(period.ve_supply)
            );
        }
    }
}
