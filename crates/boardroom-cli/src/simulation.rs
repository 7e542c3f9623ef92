//! In-memory deployment driven by a scenario
//!
//! Time only moves on `sleep` steps. Protocol errors (an expired lock, a killed
//! distributor, ...) are recorded against the step and the run carries on;
//! scenario mistakes such as an unknown account label abort the run.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context};
use boardroom_core::{
    period_floor, AccountId, BoardroomError, Clock, ManualClock, SharedBank, TokenBank, TokenId,
    CLAIM_MANY_BATCH, DAY, PERIOD,
};
use boardroom_distributor::FeeDistributor;
use boardroom_escrow::{SharedLedger, VotingEscrow};

use crate::report::{
    format_units, AccountSummary, DistributorSummary, LedgerSummary, PeriodSummary, Report,
    StepOutcome, TokenSummary,
};
use crate::scenario::{Amount, Scenario, Step};

pub struct Simulation {
    clock: Arc<ManualClock>,
    bank: SharedBank,
    ledger: SharedLedger,
    distributor: FeeDistributor,
    accounts: Vec<(String, AccountId)>,
    base: (String, TokenId),
    rewards: Vec<(String, TokenId)>,
    decimals: u32,
    outcomes: Vec<StepOutcome>,
}

impl Simulation {
    /// Deploy the ledger and distributor, register every reward token at
    /// genesis and mint the initial balances
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let labels: BTreeSet<&str> = scenario.accounts.iter().map(String::as_str).collect();
        if labels.len() != scenario.accounts.len() {
            bail!("duplicate account label");
        }
        let accounts: Vec<(String, AccountId)> = scenario
            .accounts
            .iter()
            .map(|label| (label.clone(), AccountId::from_label(label)))
            .collect();
        let admin = accounts
            .first()
            .map(|(_, id)| *id)
            .context("scenario needs at least one account")?;

        let clock = ManualClock::shared(scenario.chain.genesis_time);
        let bank = TokenBank::shared();
        let (base, rewards) = {
            let mut bank = bank.write();
            let base = bank
                .create_token(&scenario.tokens.base)
                .with_context(|| format!("creating {}", scenario.tokens.base))?;
            let mut rewards = Vec::with_capacity(scenario.tokens.rewards.len());
            for symbol in &scenario.tokens.rewards {
                let id = bank
                    .create_token(symbol)
                    .with_context(|| format!("creating {symbol}"))?;
                rewards.push((symbol.clone(), id));
            }
            (base, rewards)
        };

        let escrow = AccountId::from_label(&format!("ve-{}", scenario.tokens.base));
        let ledger =
            VotingEscrow::new(admin, base, escrow, bank.clone(), clock.clone()).into_shared();

        let emergency_return = match &scenario.emergency_return {
            Some(label) => AccountId::from_label(label),
            None => admin,
        };
        let mut distributor = FeeDistributor::new(
            ledger.clone(),
            AccountId::from_label("boardroom-distributor"),
            admin,
            emergency_return,
            bank.clone(),
            clock.clone(),
        );
        for (_, token) in &rewards {
            distributor.add_token(&admin, *token, scenario.chain.genesis_time)?;
        }

        let mut sim = Self {
            clock,
            bank,
            ledger,
            distributor,
            accounts,
            base: (scenario.tokens.base.clone(), base),
            rewards,
            decimals: scenario.tokens.decimals,
            outcomes: Vec::new(),
        };

        {
            let mut bank = sim.bank.write();
            for (_, account) in &sim.accounts {
                bank.approve(&base, account, &escrow, u128::MAX)?;
            }
        }
        for balance in &scenario.balances {
            let account = sim.account(&balance.account)?;
            let token = sim.token(&balance.token)?;
            let amount = sim.units(&balance.amount)?;
            sim.bank.write().mint(&token, &account, amount)?;
        }

        tracing::info!(
            accounts = sim.accounts.len(),
            rewards = sim.rewards.len(),
            genesis = scenario.chain.genesis_time,
            "deployment ready"
        );
        Ok(sim)
    }

    /// Deploy, run every step and summarize
    pub fn run(scenario: &Scenario) -> anyhow::Result<Report> {
        let mut sim = Self::new(scenario)?;
        for (index, step) in scenario.steps.iter().enumerate() {
            sim.step(index, step)?;
        }
        Ok(sim.report())
    }

    pub fn step(&mut self, index: usize, step: &Step) -> anyhow::Result<()> {
        let time = self.clock.now();
        let (ok, detail) = match self.apply(step) {
            Ok(detail) => {
                tracing::debug!(index, action = step.name(), %detail, "step done");
                (true, detail)
            }
            Err(err) => match err.downcast_ref::<BoardroomError>() {
                Some(e) => {
                    tracing::warn!(index, action = step.name(), error = %e, "step failed");
                    (false, e.to_string())
                }
                None => return Err(err.context(format!("step {index} ({})", step.name()))),
            },
        };
        self.outcomes.push(StepOutcome {
            index,
            action: step.name(),
            time,
            ok,
            detail,
        });
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<String> {
        let admin = self.distributor.admin();
        match step {
            Step::Sleep {
                periods,
                days,
                seconds,
            } => {
                let chain = self.clock.advance(periods * PERIOD + days * DAY + seconds);
                Ok(format!("now {} (block {})", chain.timestamp, chain.block))
            }
            Step::Lock {
                account,
                amount,
                periods,
            } => {
                let account = self.account(account)?;
                let amount = self.units(amount)?;
                let unlock = period_floor(self.clock.now() + periods * PERIOD);
                self.ledger.write().create_lock(&account, amount, unlock)?;
                Ok(format!("locked {} until {}", self.fmt(amount), unlock))
            }
            Step::IncreaseAmount { account, amount } => {
                let account = self.account(account)?;
                let amount = self.units(amount)?;
                self.ledger.write().increase_amount(&account, amount)?;
                Ok(format!("added {}", self.fmt(amount)))
            }
            Step::Extend { account, periods } => {
                let account = self.account(account)?;
                let mut ledger = self.ledger.write();
                let unlock = ledger.locked_end(&account) + periods * PERIOD;
                ledger.increase_unlock_time(&account, unlock)?;
                Ok(format!("unlock moved to {unlock}"))
            }
            Step::Withdraw { account } => {
                let account = self.account(account)?;
                let amount = self.ledger.write().withdraw(&account)?;
                Ok(format!("withdrew {}", self.fmt(amount)))
            }
            Step::DepositFees {
                token,
                amount,
                from,
            } => {
                let token = self.token(token)?;
                let amount = self.units(amount)?;
                let to = self.distributor.address();
                match from {
                    Some(label) => {
                        let from = self.account(label)?;
                        self.bank.write().transfer(&token, &from, &to, amount)?;
                    }
                    None => self.bank.write().mint(&token, &to, amount)?,
                }
                Ok(format!("deposited {}", self.fmt(amount)))
            }
            Step::CheckpointToken { token, caller } => {
                let token = self.token(token)?;
                let caller = match caller {
                    Some(label) => self.account(label)?,
                    None => admin,
                };
                self.distributor.checkpoint_token(&caller, &token)?;
                let last = self.distributor.last_token_time(&token).unwrap_or_default();
                Ok(format!("checkpointed at {last}"))
            }
            Step::CheckpointTotalSupply => {
                self.distributor.checkpoint_total_supply();
                Ok(format!("time cursor {}", self.distributor.time_cursor()))
            }
            Step::ToggleCheckpoint => {
                let enabled = self.distributor.toggle_allow_checkpoint_token(&admin)?;
                Ok(format!("public checkpoints {}", if enabled { "on" } else { "off" }))
            }
            Step::Claim { account, token } => {
                let account = self.account(account)?;
                let token = self.token(token)?;
                let paid = self.distributor.claim(&account, &token, &account)?;
                Ok(format!("paid {}", self.fmt(paid)))
            }
            Step::ClaimMany { accounts, token } => {
                if accounts.len() > CLAIM_MANY_BATCH {
                    bail!("claim_many takes at most {CLAIM_MANY_BATCH} accounts");
                }
                let token = self.token(token)?;
                let mut batch = [AccountId::ZERO; CLAIM_MANY_BATCH];
                for (slot, label) in batch.iter_mut().zip(accounts) {
                    *slot = self.account(label)?;
                }
                let paid = self.distributor.claim_many(&admin, &token, &batch)?;
                Ok(format!("paid {} in total", self.fmt(paid)))
            }
            Step::Kill => {
                self.distributor.kill_me(&admin)?;
                Ok("killed".to_string())
            }
        }
    }

    fn account(&self, label: &str) -> anyhow::Result<AccountId> {
        self.accounts
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, id)| *id)
            .with_context(|| format!("unknown account {label}"))
    }

    fn token(&self, symbol: &str) -> anyhow::Result<TokenId> {
        if self.base.0 == symbol {
            return Ok(self.base.1);
        }
        self.rewards
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, id)| *id)
            .with_context(|| format!("unknown token {symbol}"))
    }

    fn units(&self, amount: &Amount) -> anyhow::Result<u128> {
        amount.to_units(self.decimals)
    }

    fn fmt(&self, amount: u128) -> String {
        format_units(amount, self.decimals)
    }

    pub fn report(&self) -> Report {
        let chain = self.clock.snapshot();
        let ledger = self.ledger.read();
        let bank = self.bank.read();
        let registered = self.distributor.tokens();

        let accounts = self
            .accounts
            .iter()
            .map(|(label, id)| {
                let lock = ledger.locked(id);
                AccountSummary {
                    label: label.clone(),
                    id: id.to_hex(),
                    locked: lock.amount,
                    unlock_time: lock.unlock_time,
                    voting_power: ledger.balance_of(id),
                    rewards: self
                        .rewards
                        .iter()
                        .map(|(symbol, token)| (symbol.clone(), bank.balance_of(token, id)))
                        .collect(),
                }
            })
            .collect();

        let address = self.distributor.address();
        let tokens = self
            .rewards
            .iter()
            .map(|(symbol, token)| {
                let start_time = self.distributor.start_time(token);
                let mut periods = Vec::new();
                if let Some(start) = start_time {
                    let mut period = start;
                    while period <= chain.timestamp {
                        let tokens = self.distributor.tokens_per_week(token, period);
                        let ve_supply = self.distributor.ve_supply(period);
                        if tokens > 0 || ve_supply > 0 {
                            periods.push(PeriodSummary {
                                start: period,
                                tokens,
                                ve_supply,
                            });
                        }
                        period += PERIOD;
                    }
                }
                TokenSummary {
                    symbol: symbol.clone(),
                    registered: registered.contains(token),
                    start_time,
                    last_token_time: self.distributor.last_token_time(token),
                    last_balance: self.distributor.token_last_balance(token),
                    held: bank.balance_of(token, &address),
                    periods,
                }
            })
            .collect();

        Report {
            time: chain.timestamp,
            block: chain.block,
            decimals: self.decimals,
            steps: self.outcomes.clone(),
            ledger: LedgerSummary {
                locked_supply: ledger.supply(),
                voting_power: ledger.total_supply(),
                epoch: ledger.epoch(),
            },
            accounts,
            distributor: DistributorSummary {
                address: address.to_hex(),
                time_cursor: self.distributor.time_cursor(),
                killed: self.distributor.is_killed(),
                can_checkpoint_token: self.distributor.can_checkpoint_token(),
                tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::EXAMPLE;

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn scenario(steps: &str) -> Scenario {
        let header = r#"
            accounts = ["alice", "bob"]

            [[balance]]
            account = "alice"
            token = "KLONX"
            amount = 100

            [[balance]]
            account = "bob"
            token = "KLONX"
            amount = 100
        "#;
        Scenario::from_toml(&format!("{header}\n{steps}")).unwrap()
    }

    #[test]
    fn test_example_splits_evenly() {
        let report = Simulation::run(&Scenario::from_toml(EXAMPLE).unwrap()).unwrap();

        assert!(report.steps.iter().all(|s| s.ok), "{:?}", report.steps);
        for account in &report.accounts {
            assert_eq!(account.locked, 1_000 * ONE);
            assert_eq!(account.rewards["USDA"], 10 * ONE);
        }
        let usda = &report.distributor.tokens[0];
        assert!(usda.registered);
        assert_eq!(usda.held, 0);
        assert_eq!(usda.periods[0].tokens, 30 * ONE);
        assert!(usda.periods[0].ve_supply > 0);
    }

    #[test]
    fn test_protocol_errors_are_recorded() {
        let report = Simulation::run(&scenario(
            r#"
            [[step]]
            action = "withdraw"
            account = "alice"

            [[step]]
            action = "lock"
            account = "alice"
            amount = 10
            periods = 4

            [[step]]
            action = "checkpoint_token"
            token = "USDA"
            caller = "bob"
            "#,
        ))
        .unwrap();

        let ok: Vec<bool> = report.steps.iter().map(|s| s.ok).collect();
        assert_eq!(ok, vec![false, true, false]);
        assert_eq!(report.accounts[0].locked, 10 * ONE);
        assert_eq!(report.ledger.locked_supply, 10 * ONE);
    }

    #[test]
    fn test_unknown_label_aborts() {
        let err = Simulation::run(&scenario(
            r#"
            [[step]]
            action = "claim"
            account = "mallory"
            token = "USDA"
            "#,
        ))
        .unwrap_err();
        assert!(format!("{err:#}").contains("unknown account mallory"));
    }

    #[test]
    fn test_kill_sweeps_to_admin() {
        let report = Simulation::run(&scenario(
            r#"
            [[step]]
            action = "deposit_fees"
            token = "USDA"
            amount = 5

            [[step]]
            action = "kill"

            [[step]]
            action = "claim"
            account = "bob"
            token = "USDA"
            "#,
        ))
        .unwrap();

        assert!(report.distributor.killed);
        assert_eq!(report.accounts[0].rewards["USDA"], 5 * ONE);
        assert_eq!(report.distributor.tokens[0].held, 0);
        assert!(!report.steps[2].ok);
    }

    #[test]
    fn test_sleep_mines_blocks() {
        let report = Simulation::run(&scenario(
            r#"
            [[step]]
            action = "sleep"
            days = 1

            [[step]]
            action = "sleep"
            seconds = 30
            "#,
        ))
        .unwrap();
        assert_eq!(report.time, 1_699_488_000 + DAY + 30);
        assert_eq!(report.block, 3);
    }

    #[test]
    fn test_oversized_batch_aborts() {
        let accounts: Vec<String> = (0..=CLAIM_MANY_BATCH).map(|_| "\"alice\"".into()).collect();
        let steps = format!(
            "[[step]]\naction = \"claim_many\"\ntoken = \"USDA\"\naccounts = [{}]\n",
            accounts.join(", ")
        );
        assert!(Simulation::run(&scenario(&steps)).is_err());
    }
}
