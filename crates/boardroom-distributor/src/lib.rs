//! # Boardroom Distributor
//!
//! Distributes reward tokens to vote-escrow holders in proportion to their
//! voting power at each period start.
//!
//! ## Flow
//!
//! ```text
//!  fees ──► distributor balance
//!               │ checkpoint_token      (spread Δbalance over elapsed periods)
//!               ▼
//!          period buckets ──┐
//!                           ├─► claim: Σ bucket[p] * ve(account, p) / ve_supply[p]
//!  ledger ──► ve_supply ────┘     (checkpoint_total_supply)
//! ```
//!
//! Only finished periods are paid out: a bucket is final once the token
//! checkpoint has moved past it, and a period is payable once its total
//! supply has been snapshotted.

pub mod bucket;
pub mod distributor;
pub mod registry;

pub use bucket::{PeriodBuckets, SupplySnapshots};
pub use distributor::{DistributorState, FeeDistributor};
pub use registry::{RewardToken, TokenRegistry};
