//! # Fee Distributor
//!
//! Reward tokens sent to the distributor are attributed to periods by token
//! checkpoints. Each account then claims, per finished period,
//!
//! ```text
//! share = tokens_per_week[p] * ve_balance(account, p) / ve_supply[p]
//! ```
//!
//! walking its own cursor forward. Buckets are never decremented: an account
//! is paid for a period exactly once because its cursor moves past it.

use std::collections::HashMap;

use boardroom_core::prelude::*;
use boardroom_escrow::SharedPowerSource;
use serde::{Deserialize, Serialize};

use crate::bucket::{PeriodBuckets, SupplySnapshots};
use crate::registry::{RewardToken, TokenRegistry};

/// Durable distributor state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributorState {
    /// Account holding the reward tokens
    pub address: AccountId,

    pub ownership: Ownership,

    /// Receiver of the sweep on kill
    pub emergency_return: AccountId,

    /// Next period whose total supply is not yet snapshotted
    pub time_cursor: Timestamp,

    pub can_checkpoint_token: bool,

    pub is_killed: bool,

    ve_supply: SupplySnapshots,

    registry: TokenRegistry,

    cursors: HashMap<(TokenId, AccountId), Timestamp>,
}

impl DistributorState {
    pub fn new(
        address: AccountId,
        admin: AccountId,
        emergency_return: AccountId,
        now: Timestamp,
    ) -> Self {
        Self {
            address,
            ownership: Ownership::new(admin),
            emergency_return,
            time_cursor: period_floor(now),
            can_checkpoint_token: false,
            is_killed: false,
            ve_supply: SupplySnapshots::new(),
            registry: TokenRegistry::new(),
            cursors: HashMap::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Outcome of walking one account's cursor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Settlement {
    payout: u128,

    /// New cursor; `None` leaves the stored cursor untouched
    cursor: Option<Timestamp>,
}

pub struct FeeDistributor {
    state: DistributorState,
    ledger: SharedPowerSource,
    bank: SharedBank,
    clock: SharedClock,
}

impl FeeDistributor {
    pub fn new(
        ledger: SharedPowerSource,
        address: AccountId,
        admin: AccountId,
        emergency_return: AccountId,
        bank: SharedBank,
        clock: SharedClock,
    ) -> Self {
        let state = DistributorState::new(address, admin, emergency_return, clock.now());
        Self {
            state,
            ledger,
            bank,
            clock,
        }
    }

    /// Rebuild a distributor from persisted state
    pub fn from_state(
        state: DistributorState,
        ledger: SharedPowerSource,
        bank: SharedBank,
        clock: SharedClock,
    ) -> Self {
        Self {
            state,
            ledger,
            bank,
            clock,
        }
    }

    pub fn state(&self) -> &DistributorState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Register a reward token; distribution starts at the period containing
    /// `start_time`
    pub fn add_token(
        &mut self,
        caller: &AccountId,
        token: TokenId,
        start_time: Timestamp,
    ) -> Result<()> {
        self.state.ownership.ensure_admin(caller)?;
        let record = self.state.registry.register(token, start_time)?;
        tracing::info!(token = %token, start_time = record.start_time, "reward token added");
        Ok(())
    }

    /// Stop tracking a reward token; its buckets stay queryable
    pub fn delete_token(&mut self, caller: &AccountId, token: &TokenId) -> Result<()> {
        self.state.ownership.ensure_admin(caller)?;
        self.state.registry.deregister(token)?;
        tracing::info!(token = %token, "reward token deleted");
        Ok(())
    }

    pub fn toggle_allow_checkpoint_token(&mut self, caller: &AccountId) -> Result<bool> {
        self.state.ownership.ensure_admin(caller)?;
        self.state.can_checkpoint_token = !self.state.can_checkpoint_token;
        tracing::info!(enabled = self.state.can_checkpoint_token, "public token checkpoints toggled");
        Ok(self.state.can_checkpoint_token)
    }

    /// Sweep every registered token to the emergency return account and stop
    /// all claims. Safe to call again; later calls sweep whatever arrived since.
    pub fn kill_me(&mut self, caller: &AccountId) -> Result<()> {
        self.state.ownership.ensure_admin(caller)?;

        let address = self.state.address;
        let receiver = self.state.emergency_return;
        let mut bank = self.bank.write();
        for record in self.state.registry.records_mut() {
            let balance = bank.balance_of(&record.token, &address);
            if balance > 0 {
                bank.transfer(&record.token, &address, &receiver, balance)?;
                tracing::info!(token = %record.token, amount = balance, to = %receiver, "swept");
            }
            record.last_balance = 0;
        }
        drop(bank);

        self.state.is_killed = true;
        tracing::info!("distributor killed");
        Ok(())
    }

    pub fn commit_transfer_ownership(&mut self, caller: &AccountId, future: AccountId) -> Result<()> {
        self.state.ownership.commit(caller, future)
    }

    pub fn apply_transfer_ownership(&mut self, caller: &AccountId) -> Result<AccountId> {
        self.state.ownership.apply(caller)
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Attribute newly received `token` to periods
    pub fn checkpoint_token(&mut self, caller: &AccountId, token: &TokenId) -> Result<()> {
        if !self.state.can_checkpoint_token && *caller != self.state.ownership.admin() {
            return Err(BoardroomError::Unauthorized(*caller));
        }
        self.state.registry.get(token)?;
        self.checkpoint_token_unchecked(token)
    }

    fn checkpoint_token_unchecked(&mut self, token: &TokenId) -> Result<()> {
        let now = self.clock.now();
        let balance = self.bank.read().balance_of(token, &self.state.address);

        let mut record = *self.state.registry.get(token)?;
        let delta = balance.saturating_sub(record.last_balance);
        let attributed = self
            .state
            .registry
            .buckets_mut(token)
            .spread(delta, record.last_token_time, now)?;

        record.last_token_time = record.last_token_time.max(now);
        record.time_cursor = period_floor(record.last_token_time);
        record.last_balance = balance;
        *self.state.registry.get_mut(token)? = record;

        tracing::debug!(token = %token, delta, attributed, ts = now, "token checkpoint");
        Ok(())
    }

    /// Snapshot total voting power for each period start passed since the
    /// last call, at most `SUPPLY_CHECKPOINT_MAX_PERIODS` per call.
    ///
    /// A period start is only snapshotted once time has moved past it, so no
    /// lock change stamped with that exact second can follow the snapshot.
    pub fn checkpoint_total_supply(&mut self) {
        let now = self.clock.now();
        let rounded = period_floor(now);
        let mut t = self.state.time_cursor;

        for _ in 0..SUPPLY_CHECKPOINT_MAX_PERIODS {
            if t > rounded || t == now {
                break;
            }
            let supply = self.ledger.total_supply_at(t);
            self.state.ve_supply.record(t, supply);
            t += PERIOD;
        }

        self.state.time_cursor = t;
        tracing::debug!(time_cursor = t, "total supply checkpoint");
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Pay `account` its share of `token` for every finished period since its
    /// last claim (at most `CLAIM_MAX_PERIODS` per call)
    pub fn claim(&mut self, caller: &AccountId, token: &TokenId, account: &AccountId) -> Result<u128> {
        self.prepare_claim(token)?;

        let settlement = self.settle(token, account, self.cursor(token, account))?;
        if settlement.payout > 0 {
            let remaining = self
                .state
                .registry
                .get(token)?
                .last_balance
                .checked_sub(settlement.payout)
                .ok_or(BoardroomError::Overflow)?;
            self.bank
                .write()
                .transfer(token, &self.state.address, account, settlement.payout)?;
            self.state.registry.get_mut(token)?.last_balance = remaining;
        }
        if let Some(cursor) = settlement.cursor {
            self.state.cursors.insert((*token, *account), cursor);
        }

        if settlement.payout > 0 {
            tracing::info!(
                token = %token,
                account = %account,
                caller = %caller,
                amount = settlement.payout,
                "fees claimed"
            );
        }
        Ok(settlement.payout)
    }

    /// Claim for a fixed-size batch; `AccountId::ZERO` entries are padding.
    /// Returns the total paid.
    pub fn claim_many(
        &mut self,
        caller: &AccountId,
        token: &TokenId,
        accounts: &[AccountId; CLAIM_MANY_BATCH],
    ) -> Result<u128> {
        self.prepare_claim(token)?;

        let mut pending: HashMap<AccountId, Timestamp> = HashMap::new();
        let mut payouts: Vec<(AccountId, u128)> = Vec::new();
        let mut total: u128 = 0;

        for account in accounts.iter().filter(|a| !a.is_zero()) {
            let cursor = pending
                .get(account)
                .copied()
                .or_else(|| self.cursor(token, account));
            let settlement = self.settle(token, account, cursor)?;
            if let Some(cursor) = settlement.cursor {
                pending.insert(*account, cursor);
            }
            if settlement.payout > 0 {
                total = total
                    .checked_add(settlement.payout)
                    .ok_or(BoardroomError::Overflow)?;
                payouts.push((*account, settlement.payout));
            }
        }

        if total > 0 {
            let remaining = self
                .state
                .registry
                .get(token)?
                .last_balance
                .checked_sub(total)
                .ok_or(BoardroomError::Overflow)?;
            let mut bank = self.bank.write();
            let available = bank.balance_of(token, &self.state.address);
            if available < total {
                return Err(BoardroomError::InsufficientBalance {
                    required: total,
                    available,
                });
            }
            for (account, amount) in &payouts {
                bank.transfer(token, &self.state.address, account, *amount)?;
            }
            drop(bank);
            self.state.registry.get_mut(token)?.last_balance = remaining;
        }
        for (account, cursor) in pending {
            self.state.cursors.insert((*token, account), cursor);
        }

        tracing::info!(
            token = %token,
            caller = %caller,
            accounts = payouts.len(),
            amount = total,
            "batch claim"
        );
        Ok(total)
    }

    /// Shared claim preamble: reject when killed or unregistered, then bring
    /// the supply snapshots and (when allowed) the token checkpoint up to date
    fn prepare_claim(&mut self, token: &TokenId) -> Result<()> {
        if self.state.is_killed {
            return Err(BoardroomError::Killed);
        }
        let record = *self.state.registry.get(token)?;
        let now = self.clock.now();

        if now >= self.state.time_cursor {
            self.checkpoint_total_supply();
        }
        if self.state.can_checkpoint_token
            && now > record.last_token_time + TOKEN_CHECKPOINT_DEADLINE
        {
            self.checkpoint_token_unchecked(token)?;
        }
        Ok(())
    }

    fn settle(
        &self,
        token: &TokenId,
        account: &AccountId,
        stored: Option<Timestamp>,
    ) -> Result<Settlement> {
        let record: &RewardToken = self.state.registry.get(token)?;
        let bound = record.time_cursor.min(self.state.time_cursor);

        let mut cursor = match stored {
            Some(cursor) => cursor,
            None => match self.ledger.checkpoint_near(account, record.start_time) {
                Some(ts) => period_ceil(ts).max(record.start_time),
                None => return Ok(Settlement::default()),
            },
        };
        if cursor >= bound {
            return Ok(Settlement {
                payout: 0,
                cursor: Some(cursor),
            });
        }

        let last_checkpoint = self.ledger.last_checkpoint(account).unwrap_or(0);
        let empty = PeriodBuckets::new();
        let buckets = self.state.registry.buckets(token).unwrap_or(&empty);
        let mut payout: u128 = 0;

        for _ in 0..CLAIM_MAX_PERIODS {
            if cursor >= bound {
                break;
            }
            let balance = self.ledger.balance_of_at(account, cursor);
            if balance == 0 && last_checkpoint <= cursor {
                break;
            }
            let supply = self.state.ve_supply.get(cursor);
            if balance > 0 && supply > 0 {
                let share = mul_div_floor(buckets.get(cursor), balance, supply)?;
                payout = payout.checked_add(share).ok_or(BoardroomError::Overflow)?;
            }
            cursor += PERIOD;
        }

        Ok(Settlement {
            payout,
            cursor: Some(cursor),
        })
    }

    fn cursor(&self, token: &TokenId, account: &AccountId) -> Option<Timestamp> {
        self.state.cursors.get(&(*token, *account)).copied()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn address(&self) -> AccountId {
        self.state.address
    }

    pub fn time_cursor(&self) -> Timestamp {
        self.state.time_cursor
    }

    /// Next unclaimed period of `account` for `token` (0 before its first claim)
    pub fn time_cursor_of(&self, token: &TokenId, account: &AccountId) -> Timestamp {
        self.cursor(token, account).unwrap_or(0)
    }

    pub fn tokens_per_week(&self, token: &TokenId, period: Timestamp) -> u128 {
        self.state
            .registry
            .buckets(token)
            .map_or(0, |b| b.get(period))
    }

    pub fn ve_supply(&self, period: Timestamp) -> u128 {
        self.state.ve_supply.get(period)
    }

    /// Voting power of `account` at `t`, as used for claims
    pub fn ve_for_at(&self, account: &AccountId, t: Timestamp) -> u128 {
        self.ledger.balance_of_at(account, t)
    }

    pub fn start_time(&self, token: &TokenId) -> Option<Timestamp> {
        self.state.registry.record(token).map(|r| r.start_time)
    }

    pub fn last_token_time(&self, token: &TokenId) -> Option<Timestamp> {
        self.state.registry.record(token).map(|r| r.last_token_time)
    }

    pub fn token_time_cursor(&self, token: &TokenId) -> Option<Timestamp> {
        self.state.registry.record(token).map(|r| r.time_cursor)
    }

    pub fn token_last_balance(&self, token: &TokenId) -> Option<u128> {
        self.state.registry.record(token).map(|r| r.last_balance)
    }

    /// Registered tokens in registration order
    pub fn tokens(&self) -> Vec<TokenId> {
        self.state.registry.tokens().copied().collect()
    }

    pub fn can_checkpoint_token(&self) -> bool {
        self.state.can_checkpoint_token
    }

    pub fn is_killed(&self) -> bool {
        self.state.is_killed
    }

    pub fn emergency_return(&self) -> AccountId {
        self.state.emergency_return
    }

    pub fn admin(&self) -> AccountId {
        self.state.ownership.admin()
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.state.ownership.future_admin()
    }
}
