//! Period-keyed stores
//!
//! Both stores are keyed by period-start timestamps and only ever grow:
//! buckets are merged into by token checkpoints, snapshots are written once
//! as the total-supply cursor passes them.

use std::collections::BTreeMap;

use boardroom_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward amounts attributed to each period for one token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBuckets {
    buckets: BTreeMap<Timestamp, u128>,
}

impl PeriodBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount attributed to the period starting at `period`
    pub fn get(&self, period: Timestamp) -> u128 {
        self.buckets.get(&period).copied().unwrap_or(0)
    }

    pub fn add(&mut self, period: Timestamp, amount: u128) {
        if amount > 0 {
            *self.buckets.entry(period).or_insert(0) += amount;
        }
    }

    /// Sum over every bucket
    pub fn total(&self) -> u128 {
        self.buckets.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, u128)> + '_ {
        self.buckets.iter().map(|(p, a)| (*p, *a))
    }

    /// Attribute `amount` over `[from, to]`, each period receiving the share
    /// proportional to its overlap with the interval.
    ///
    /// At most `TOKEN_CHECKPOINT_MAX_PERIODS` periods are touched; whatever
    /// falls beyond them is not attributed. Returns the amount attributed.
    pub fn spread(&mut self, amount: u128, from: Timestamp, to: Timestamp) -> Result<u128> {
        if to <= from {
            self.add(period_floor(from), amount);
            return Ok(amount);
        }

        let elapsed = (to - from) as u128;
        let mut attributed = 0;
        let mut t = from;
        let mut this_period = period_floor(t);

        for _ in 0..TOKEN_CHECKPOINT_MAX_PERIODS {
            let next_period = this_period + PERIOD;
            let end = next_period.min(to);
            let share = mul_div_floor(amount, (end - t) as u128, elapsed)?;
            self.add(this_period, share);
            attributed += share;
            if to < next_period {
                break;
            }
            t = next_period;
            this_period = next_period;
        }

        Ok(attributed)
    }
}

/// Total voting power recorded at period starts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySnapshots {
    snapshots: BTreeMap<Timestamp, u128>,
}

impl SupplySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot at `period`, zero if not yet recorded
    pub fn get(&self, period: Timestamp) -> u128 {
        self.snapshots.get(&period).copied().unwrap_or(0)
    }

    pub fn contains(&self, period: Timestamp) -> bool {
        self.snapshots.contains_key(&period)
    }

    pub fn record(&mut self, period: Timestamp, supply: u128) {
        self.snapshots.insert(period, supply);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
