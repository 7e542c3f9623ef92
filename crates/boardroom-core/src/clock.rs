//! Clock collaborator
//!
//! Every ledger and distributor operation reads the current time and block
//! height from a [`Clock`]. The only requirement is monotonicity: neither value
//! may ever go backwards.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BoardroomError, Result};
use crate::types::{BlockNumber, Timestamp};

/// Monotonic source of time and block height
pub trait Clock: Send + Sync {
    /// Current time in seconds
    fn now(&self) -> Timestamp;

    /// Current block height
    fn current_block(&self) -> BlockNumber;
}

/// Shared handle to a clock
pub type SharedClock = Arc<dyn Clock>;

/// Time and block height at one instant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTime {
    pub timestamp: Timestamp,
    pub block: BlockNumber,
}

/// Manually driven clock for tests and simulation
///
/// `sleep` moves time without producing a block, `mine` produces a block at
/// the current time. This mirrors a development chain where time can be
/// fast-forwarded between transactions.
pub struct ManualClock {
    state: Mutex<ChainTime>,
}

impl ManualClock {
    /// Create a clock starting at `timestamp`, block 1
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            state: Mutex::new(ChainTime { timestamp, block: 1 }),
        }
    }

    /// Create a shared clock
    pub fn shared(timestamp: Timestamp) -> Arc<Self> {
        Arc::new(Self::new(timestamp))
    }

    /// Snapshot of the current instant
    pub fn snapshot(&self) -> ChainTime {
        *self.state.lock()
    }

    /// Move time forward without mining
    pub fn sleep(&self, seconds: u64) {
        let mut state = self.state.lock();
        state.timestamp += seconds;
    }

    /// Produce one block at the current time
    pub fn mine(&self) -> BlockNumber {
        let mut state = self.state.lock();
        state.block += 1;
        state.block
    }

    /// Move time forward and mine one block
    pub fn advance(&self, seconds: u64) -> ChainTime {
        let mut state = self.state.lock();
        state.timestamp += seconds;
        state.block += 1;
        *state
    }

    /// Mine one block at an absolute timestamp
    pub fn mine_at(&self, timestamp: Timestamp) -> Result<ChainTime> {
        let mut state = self.state.lock();
        if timestamp < state.timestamp {
            return Err(BoardroomError::InvalidState("clock cannot move backwards"));
        }
        state.timestamp = timestamp;
        state.block += 1;
        Ok(*state)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.state.lock().timestamp
    }

    fn current_block(&self) -> BlockNumber {
        self.state.lock().block
    }
}

/// Wall clock with a block height derived from a fixed block interval
pub struct SystemClock {
    genesis_time: Timestamp,
    block_interval_secs: u64,
}

impl SystemClock {
    pub fn new(genesis_time: Timestamp, block_interval_secs: u64) -> Self {
        Self {
            genesis_time,
            block_interval_secs: block_interval_secs.max(1),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0, 12)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }

    fn current_block(&self) -> BlockNumber {
        self.now().saturating_sub(self.genesis_time) / self.block_interval_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_does_not_mine() {
        let clock = ManualClock::new(1_000);
        clock.sleep(50);
        assert_eq!(clock.now(), 1_050);
        assert_eq!(clock.current_block(), 1);
    }

    #[test]
    fn test_advance_mines() {
        let clock = ManualClock::new(1_000);
        let t = clock.advance(10);
        assert_eq!(t.timestamp, 1_010);
        assert_eq!(t.block, 2);
        clock.mine();
        assert_eq!(clock.current_block(), 3);
    }

    #[test]
    fn test_mine_at_rejects_backwards() {
        let clock = ManualClock::new(1_000);
        assert!(clock.mine_at(999).is_err());
        assert_eq!(clock.mine_at(2_000).unwrap().timestamp, 2_000);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::default();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(clock.current_block() > 0);
    }
}
