//! Read-only view of voting power consumed by the fee distributor

use std::sync::Arc;

use boardroom_core::{AccountId, Timestamp};
use parking_lot::RwLock;

/// Shared read-only handle to a voting power source
pub type SharedPowerSource = Arc<dyn VotingPowerSource>;

/// Historical voting power, queried by timestamp
pub trait VotingPowerSource: Send + Sync {
    /// Voting power of `account` at `t`
    fn balance_of_at(&self, account: &AccountId, t: Timestamp) -> u128;

    /// Total voting power at `t`
    fn total_supply_at(&self, t: Timestamp) -> u128;

    /// Time of the latest checkpoint of `account` at or before `t`, or of its
    /// first checkpoint when all are later. `None` if the account never locked.
    fn checkpoint_near(&self, account: &AccountId, t: Timestamp) -> Option<Timestamp>;

    /// Time of the most recent checkpoint of `account`
    fn last_checkpoint(&self, account: &AccountId) -> Option<Timestamp>;
}

impl<T: VotingPowerSource> VotingPowerSource for RwLock<T> {
    fn balance_of_at(&self, account: &AccountId, t: Timestamp) -> u128 {
        self.read().balance_of_at(account, t)
    }

    fn total_supply_at(&self, t: Timestamp) -> u128 {
        self.read().total_supply_at(t)
    }

    fn checkpoint_near(&self, account: &AccountId, t: Timestamp) -> Option<Timestamp> {
        self.read().checkpoint_near(account, t)
    }

    fn last_checkpoint(&self, account: &AccountId) -> Option<Timestamp> {
        self.read().last_checkpoint(account)
    }
}
