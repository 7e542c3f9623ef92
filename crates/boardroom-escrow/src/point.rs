//! Locks and checkpoints
//!
//! A [`Point`] encodes linearly decaying voting power:
//!
//! ```text
//! power(t) = max(0, bias - slope * (t - ts))
//! ```

use boardroom_core::{BlockNumber, Timestamp, MAX_LOCK};
use serde::{Deserialize, Serialize};

/// Escrowed balance of one account
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Base tokens held in escrow
    pub amount: u128,

    /// Period-aligned unlock time (0 when no lock exists)
    pub unlock_time: Timestamp,
}

impl Lock {
    pub fn new(amount: u128, unlock_time: Timestamp) -> Self {
        Self {
            amount,
            unlock_time,
        }
    }

    /// Whether anything is escrowed (expired or not)
    pub fn exists(&self) -> bool {
        self.amount > 0
    }

    /// Whether the lock still contributes voting power at `now`
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.amount > 0 && self.unlock_time > now
    }

    /// Decay rate of this lock: amount / MAX_LOCK, floored
    pub fn slope(&self) -> i128 {
        (self.amount / MAX_LOCK as u128) as i128
    }

    /// Account checkpoint for this lock evaluated at `now`
    pub fn point_at(&self, now: Timestamp) -> Point {
        if !self.is_active(now) {
            return Point::default();
        }
        let slope = self.slope();
        Point {
            bias: slope * (self.unlock_time - now) as i128,
            slope,
            ts: now,
            blk: 0,
        }
    }
}

/// Checkpoint of a decay line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// Voting power at `ts`
    pub bias: i128,

    /// Power lost per second
    pub slope: i128,

    /// Checkpoint time
    pub ts: Timestamp,

    /// Block height at `ts`
    pub blk: BlockNumber,
}

impl Point {
    pub fn genesis(ts: Timestamp, blk: BlockNumber) -> Self {
        Self {
            bias: 0,
            slope: 0,
            ts,
            blk,
        }
    }

    /// Decayed power at `t`, clamped at zero. Times before `ts` read as `ts`.
    pub fn value_at(&self, t: Timestamp) -> u128 {
        let dt = t.saturating_sub(self.ts) as i128;
        (self.bias - self.slope * dt).max(0) as u128
    }

    pub(crate) fn clamp_non_negative(&mut self) {
        self.bias = self.bias.max(0);
        self.slope = self.slope.max(0);
    }
}

/// Selector for historical queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoricalQuery {
    /// At a wall-clock time
    Timestamp(Timestamp),

    /// At a block height (must not be in the future)
    Block(BlockNumber),
}
