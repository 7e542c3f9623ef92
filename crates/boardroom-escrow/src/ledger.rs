//! # Escrow Ledger
//!
//! Tracks each account's lock as a linearly decaying quantity and keeps two
//! append-only checkpoint histories:
//!
//! - the **global history**: one point per state change, plus one point per
//!   period boundary crossed since the previous change
//! - the **account histories**: one point per change to that account's lock
//!
//! Expiries are scheduled in a sparse `period -> Δslope` map and folded into
//! the global line lazily, whenever a checkpoint or a supply query crosses the
//! period they belong to.
//!
//! ```text
//!  power
//!    │╲
//!    │  ╲   slope = amount / MAX_LOCK
//!    │    ╲
//!    │      ╲
//!    └────────╲──────────── t
//!    now       unlock_time
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use boardroom_core::prelude::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::point::{HistoricalQuery, Lock, Point};
use crate::source::VotingPowerSource;

/// Shared handle to a ledger
pub type SharedLedger = Arc<RwLock<VotingEscrow>>;

/// Durable ledger state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscrowState {
    /// Token escrowed by locks
    pub base_token: TokenId,

    /// Account holding the escrowed tokens
    pub address: AccountId,

    pub ownership: Ownership,

    /// Total escrowed base tokens
    pub supply: u128,

    locks: HashMap<AccountId, Lock>,

    /// Global history; index 0 is the genesis point
    point_history: Vec<Point>,

    user_point_history: HashMap<AccountId, Vec<Point>>,

    /// Period boundary -> slope delta applied when the boundary is crossed
    slope_changes: BTreeMap<Timestamp, i128>,
}

impl EscrowState {
    pub fn new(
        admin: AccountId,
        base_token: TokenId,
        address: AccountId,
        genesis: Point,
    ) -> Self {
        Self {
            base_token,
            address,
            ownership: Ownership::new(admin),
            supply: 0,
            locks: HashMap::new(),
            point_history: vec![genesis],
            user_point_history: HashMap::new(),
            slope_changes: BTreeMap::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Vote-escrow ledger
pub struct VotingEscrow {
    state: EscrowState,
    bank: SharedBank,
    clock: SharedClock,
}

impl VotingEscrow {
    /// Deploy a ledger escrowing `base_token` into `address`
    pub fn new(
        admin: AccountId,
        base_token: TokenId,
        address: AccountId,
        bank: SharedBank,
        clock: SharedClock,
    ) -> Self {
        let genesis = Point::genesis(clock.now(), clock.current_block());
        Self {
            state: EscrowState::new(admin, base_token, address, genesis),
            bank,
            clock,
        }
    }

    /// Rebuild a ledger from persisted state
    pub fn from_state(state: EscrowState, bank: SharedBank, clock: SharedClock) -> Self {
        Self { state, bank, clock }
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    pub fn state(&self) -> &EscrowState {
        &self.state
    }

    // ------------------------------------------------------------------
    // Lock lifecycle
    // ------------------------------------------------------------------

    /// Escrow `amount` base tokens from `caller` until `unlock_time`
    pub fn create_lock(
        &mut self,
        caller: &AccountId,
        amount: u128,
        unlock_time: Timestamp,
    ) -> Result<()> {
        let now = self.clock.now();

        if caller.is_zero() {
            return Err(BoardroomError::InvalidState("zero account cannot lock"));
        }
        if self.locked(caller).exists() {
            return Err(BoardroomError::InvalidState(
                "existing lock must be withdrawn first",
            ));
        }
        if amount == 0 {
            return Err(BoardroomError::InvalidAmount("lock amount must be positive"));
        }
        Self::check_unlock_time(unlock_time, now)?;

        self.deposit(caller, caller, amount, Some(unlock_time))?;
        tracing::info!(account = %caller, amount, unlock_time, "lock created");
        Ok(())
    }

    /// Add `delta` base tokens to the caller's active lock
    pub fn increase_amount(&mut self, caller: &AccountId, delta: u128) -> Result<()> {
        self.deposit_for(caller, caller, delta)
    }

    /// Add `amount` from `caller` to `account`'s active lock without changing
    /// its unlock time
    pub fn deposit_for(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let now = self.clock.now();
        let lock = self.locked(account);

        if amount == 0 {
            return Err(BoardroomError::InvalidAmount("deposit must be positive"));
        }
        if !lock.exists() {
            return Err(BoardroomError::InvalidState("no existing lock found"));
        }
        if lock.unlock_time <= now {
            return Err(BoardroomError::InvalidState("cannot add to expired lock"));
        }

        self.deposit(caller, account, amount, None)?;
        tracing::info!(account = %account, payer = %caller, amount, "lock amount increased");
        Ok(())
    }

    /// Move the caller's unlock time later
    pub fn increase_unlock_time(
        &mut self,
        caller: &AccountId,
        new_unlock_time: Timestamp,
    ) -> Result<()> {
        let now = self.clock.now();
        let lock = self.locked(caller);

        if !lock.exists() {
            return Err(BoardroomError::InvalidState("nothing is locked"));
        }
        if lock.unlock_time <= now {
            return Err(BoardroomError::InvalidState("lock expired"));
        }
        if new_unlock_time <= lock.unlock_time {
            return Err(BoardroomError::InvalidDuration(
                "can only increase lock duration",
            ));
        }
        Self::check_unlock_time(new_unlock_time, now)?;

        self.deposit(caller, caller, 0, Some(new_unlock_time))?;
        tracing::info!(account = %caller, unlock_time = new_unlock_time, "lock extended");
        Ok(())
    }

    /// Release an expired lock back to its owner; returns the amount paid out
    pub fn withdraw(&mut self, caller: &AccountId) -> Result<u128> {
        let now = self.clock.now();
        let old = self.locked(caller);

        if !old.exists() {
            return Err(BoardroomError::InvalidState("nothing is locked"));
        }
        if now < old.unlock_time {
            return Err(BoardroomError::InvalidState("the lock didn't expire"));
        }

        self.bank.write().transfer(
            &self.state.base_token,
            &self.state.address,
            caller,
            old.amount,
        )?;

        self.state.supply -= old.amount;
        self.state.locks.remove(caller);
        self.checkpoint_account(Some((caller, old, Lock::default())));

        tracing::info!(account = %caller, amount = old.amount, "lock withdrawn");
        Ok(old.amount)
    }

    /// Record a global checkpoint, folding in every period boundary crossed
    /// since the last one
    pub fn checkpoint(&mut self) {
        self.checkpoint_account(None);
    }

    fn check_unlock_time(unlock_time: Timestamp, now: Timestamp) -> Result<()> {
        if !is_period_aligned(unlock_time) {
            return Err(BoardroomError::InvalidDuration(
                "unlock time must fall on a period boundary",
            ));
        }
        if unlock_time <= now {
            return Err(BoardroomError::InvalidDuration(
                "can only lock until a time in the future",
            ));
        }
        if unlock_time > now + MAX_LOCK {
            return Err(BoardroomError::InvalidDuration("lock exceeds the maximum duration"));
        }
        Ok(())
    }

    /// Pull `amount` from `payer` into `account`'s lock and checkpoint
    fn deposit(
        &mut self,
        payer: &AccountId,
        account: &AccountId,
        amount: u128,
        unlock_time: Option<Timestamp>,
    ) -> Result<()> {
        let old = self.locked(account);
        let mut new = old;
        new.amount = old
            .amount
            .checked_add(amount)
            .ok_or(BoardroomError::Overflow)?;
        if new.amount > i128::MAX as u128 {
            return Err(BoardroomError::InvalidAmount("lock amount too large"));
        }
        if let Some(t) = unlock_time {
            new.unlock_time = t;
        }
        let supply = self
            .state
            .supply
            .checked_add(amount)
            .ok_or(BoardroomError::Overflow)?;
        // Global bias and slope are bounded by the escrowed total
        if supply > i128::MAX as u128 {
            return Err(BoardroomError::InvalidAmount("escrow supply too large"));
        }

        if amount > 0 {
            self.bank.write().transfer_from(
                &self.state.base_token,
                &self.state.address,
                payer,
                &self.state.address,
                amount,
            )?;
        }

        self.state.supply = supply;
        self.state.locks.insert(*account, new);
        self.checkpoint_account(Some((account, old, new)));
        Ok(())
    }

    /// Advance the global history to now and, when an account changed,
    /// apply its old -> new transition to the global line, the slope schedule
    /// and its own history.
    fn checkpoint_account(&mut self, change: Option<(&AccountId, Lock, Lock)>) {
        let now = self.clock.now();
        let block = self.clock.current_block();

        let mut u_old = Point::default();
        let mut u_new = Point::default();
        let mut old_dslope = 0i128;
        let mut new_dslope = 0i128;

        if let Some((_, old, new)) = change {
            u_old = old.point_at(now);
            u_new = new.point_at(now);

            old_dslope = self.slope_change(old.unlock_time);
            if new.unlock_time != 0 {
                new_dslope = if new.unlock_time == old.unlock_time {
                    old_dslope
                } else {
                    self.slope_change(new.unlock_time)
                };
            }
        }

        let mut last_point = self
            .state
            .point_history
            .last()
            .copied()
            .unwrap_or_else(|| Point::genesis(now, block));
        let initial = last_point;
        let mut last_checkpoint = last_point.ts;

        let block_slope = if now > initial.ts {
            BLOCK_SLOPE_SCALE * block.saturating_sub(initial.blk) as u128
                / (now - initial.ts) as u128
        } else {
            0
        };

        // Fill one point per crossed period boundary
        let mut t_i = period_floor(last_checkpoint);
        for _ in 0..LEDGER_MAX_PERIOD_STEPS {
            t_i += PERIOD;
            let mut d_slope = 0;
            if t_i > now {
                t_i = now;
            } else {
                d_slope = self.slope_change(t_i);
            }
            last_point.bias -= last_point.slope * (t_i - last_checkpoint) as i128;
            last_point.slope += d_slope;
            last_point.clamp_non_negative();
            last_checkpoint = t_i;
            last_point.ts = t_i;
            last_point.blk = initial.blk
                + (block_slope * (t_i - initial.ts) as u128 / BLOCK_SLOPE_SCALE) as u64;
            if t_i == now {
                last_point.blk = block;
                break;
            }
            self.state.point_history.push(last_point);
        }

        if change.is_some() {
            last_point.slope += u_new.slope - u_old.slope;
            last_point.bias += u_new.bias - u_old.bias;
            last_point.clamp_non_negative();
        }
        self.state.point_history.push(last_point);

        let Some((account, old, new)) = change else {
            tracing::debug!(epoch = self.epoch(), ts = now, "global checkpoint");
            return;
        };

        // Re-anchor the scheduled expiries
        if old.unlock_time > now {
            old_dslope += u_old.slope;
            if new.unlock_time == old.unlock_time {
                old_dslope -= u_new.slope;
            }
            self.state.slope_changes.insert(old.unlock_time, old_dslope);
        }
        if new.unlock_time > now && new.unlock_time > old.unlock_time {
            new_dslope -= u_new.slope;
            self.state.slope_changes.insert(new.unlock_time, new_dslope);
        }

        u_new.ts = now;
        u_new.blk = block;
        self.state
            .user_point_history
            .entry(*account)
            .or_default()
            .push(u_new);

        tracing::debug!(
            account = %account,
            epoch = self.epoch(),
            bias = u_new.bias,
            slope = u_new.slope,
            "account checkpoint"
        );
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    pub fn commit_transfer_ownership(&mut self, caller: &AccountId, future: AccountId) -> Result<()> {
        self.state.ownership.commit(caller, future)
    }

    pub fn apply_transfer_ownership(&mut self, caller: &AccountId) -> Result<AccountId> {
        self.state.ownership.apply(caller)
    }

    pub fn admin(&self) -> AccountId {
        self.state.ownership.admin()
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.state.ownership.future_admin()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn locked(&self, account: &AccountId) -> Lock {
        self.state.locks.get(account).copied().unwrap_or_default()
    }

    pub fn locked_end(&self, account: &AccountId) -> Timestamp {
        self.locked(account).unlock_time
    }

    /// Total escrowed base tokens
    pub fn supply(&self) -> u128 {
        self.state.supply
    }

    pub fn base_token(&self) -> TokenId {
        self.state.base_token
    }

    pub fn address(&self) -> AccountId {
        self.state.address
    }

    /// Index of the latest global point
    pub fn epoch(&self) -> usize {
        self.state.point_history.len().saturating_sub(1)
    }

    pub fn point_history(&self, epoch: usize) -> Option<Point> {
        self.state.point_history.get(epoch).copied()
    }

    /// Number of checkpoints recorded for `account`
    pub fn user_point_epoch(&self, account: &AccountId) -> usize {
        self.state
            .user_point_history
            .get(account)
            .map_or(0, Vec::len)
    }

    /// Account checkpoint by index; index 0 is the first checkpoint
    pub fn user_point_history(&self, account: &AccountId, index: usize) -> Option<Point> {
        self.state
            .user_point_history
            .get(account)
            .and_then(|h| h.get(index))
            .copied()
    }

    pub fn last_user_slope(&self, account: &AccountId) -> i128 {
        self.state
            .user_point_history
            .get(account)
            .and_then(|h| h.last())
            .map_or(0, |p| p.slope)
    }

    /// Scheduled slope delta at a period boundary
    pub fn slope_change(&self, t: Timestamp) -> i128 {
        self.state.slope_changes.get(&t).copied().unwrap_or(0)
    }

    /// Current voting power of `account`
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balance_at_time(account, self.clock.now())
    }

    /// Current total voting power
    pub fn total_supply(&self) -> u128 {
        self.total_supply_at_time(self.clock.now())
    }

    /// Voting power of `account` at a past (or future) time or past block
    pub fn balance_at(&self, account: &AccountId, at: HistoricalQuery) -> Result<u128> {
        match at {
            HistoricalQuery::Timestamp(t) => Ok(self.balance_at_time(account, t)),
            HistoricalQuery::Block(b) => {
                let Some((_, block_time)) = self.block_to_time(b)? else {
                    return Ok(0);
                };
                let Some(history) = self.state.user_point_history.get(account) else {
                    return Ok(0);
                };
                let idx = history.partition_point(|p| p.blk <= b);
                Ok(idx
                    .checked_sub(1)
                    .map_or(0, |i| history[i].value_at(block_time)))
            }
        }
    }

    /// Total voting power at a past (or future) time or past block
    pub fn total_supply_at(&self, at: HistoricalQuery) -> Result<u128> {
        match at {
            HistoricalQuery::Timestamp(t) => Ok(self.total_supply_at_time(t)),
            HistoricalQuery::Block(b) => Ok(self
                .block_to_time(b)?
                .map_or(0, |(epoch, t)| {
                    self.supply_at(self.state.point_history[epoch], t)
                })),
        }
    }

    fn balance_at_time(&self, account: &AccountId, t: Timestamp) -> u128 {
        self.state
            .user_point_history
            .get(account)
            .and_then(|h| h.partition_point(|p| p.ts <= t).checked_sub(1).map(|i| h[i]))
            .map_or(0, |p| p.value_at(t))
    }

    fn total_supply_at_time(&self, t: Timestamp) -> u128 {
        let history = &self.state.point_history;
        history
            .partition_point(|p| p.ts <= t)
            .checked_sub(1)
            .map_or(0, |epoch| self.supply_at(history[epoch], t))
    }

    /// Decay `point` forward to `t`, applying every scheduled slope change on
    /// the way
    fn supply_at(&self, point: Point, t: Timestamp) -> u128 {
        let mut last = point;
        let mut t_i = period_floor(last.ts);
        for _ in 0..LEDGER_MAX_PERIOD_STEPS {
            t_i += PERIOD;
            let mut d_slope = 0;
            if t_i > t {
                t_i = t;
            } else {
                d_slope = self.slope_change(t_i);
            }
            last.bias -= last.slope * t_i.saturating_sub(last.ts) as i128;
            if t_i == t {
                break;
            }
            last.slope += d_slope;
            last.ts = t_i;
        }
        last.bias.max(0) as u128
    }

    /// Global epoch at or before block `b` and the interpolated time of `b`
    fn block_to_time(&self, b: BlockNumber) -> Result<Option<(usize, Timestamp)>> {
        let current = self.clock.current_block();
        if b > current {
            return Err(BoardroomError::InvalidState("block is in the future"));
        }

        let history = &self.state.point_history;
        let Some(epoch) = history.partition_point(|p| p.blk <= b).checked_sub(1) else {
            return Ok(None);
        };
        let p0 = history[epoch];
        let (d_block, d_t) = match history.get(epoch + 1) {
            Some(next) => (next.blk - p0.blk, next.ts - p0.ts),
            None => (
                current.saturating_sub(p0.blk),
                self.clock.now().saturating_sub(p0.ts),
            ),
        };

        let mut block_time = p0.ts;
        if d_block != 0 {
            block_time += (d_t as u128 * (b - p0.blk) as u128 / d_block as u128) as u64;
        }
        Ok(Some((epoch, block_time)))
    }
}

impl VotingPowerSource for VotingEscrow {
    fn balance_of_at(&self, account: &AccountId, t: Timestamp) -> u128 {
        self.balance_at_time(account, t)
    }

    fn total_supply_at(&self, t: Timestamp) -> u128 {
        self.total_supply_at_time(t)
    }

    fn checkpoint_near(&self, account: &AccountId, t: Timestamp) -> Option<Timestamp> {
        let history = self.state.user_point_history.get(account)?;
        match history.partition_point(|p| p.ts <= t).checked_sub(1) {
            Some(i) => Some(history[i].ts),
            None => history.first().map(|p| p.ts),
        }
    }

    fn last_checkpoint(&self, account: &AccountId) -> Option<Timestamp> {
        self.state
            .user_point_history
            .get(account)
            .and_then(|h| h.last())
            .map(|p| p.ts)
    }
}
