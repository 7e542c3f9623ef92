//! # Boardroom Core
//!
//! Shared building blocks for the vote-escrow boardroom:
//! - [`types`] - account and token identifiers, period arithmetic
//! - [`clock`] - the monotonic time/block collaborator
//! - [`token`] - in-memory fungible-token bank
//! - [`admin`] - two-phase ownership
//! - [`math`] - 256-bit intermediate multiply/divide
//! - [`error`] - the error type every crate returns
//!
//! ## Periods
//!
//! ```text
//!   |<------ PERIOD ------>|<------ PERIOD ------>|<---- in progress ...
//!   p0                     p1                     p2        now
//!   (final)                (final)                (bucket still filling)
//! ```
//!
//! Locks always end on a period boundary, and rewards are bucketed per period.

pub mod admin;
pub mod clock;
pub mod error;
pub mod math;
pub mod token;
pub mod types;

pub use admin::*;
pub use clock::*;
pub use error::*;
pub use token::*;
pub use types::*;

/// Protocol constants
pub mod constants {
    /// Seconds in a day
    pub const DAY: u64 = 86_400;

    /// Accounting period: one week
    pub const PERIOD: u64 = 7 * DAY;

    /// Longest permitted lock: four years
    pub const MAX_LOCK: u64 = 4 * 365 * DAY;

    /// Period boundaries folded into the global history by one ledger checkpoint
    pub const LEDGER_MAX_PERIOD_STEPS: usize = 255;

    /// Periods one reward-token checkpoint spreads a balance delta over
    pub const TOKEN_CHECKPOINT_MAX_PERIODS: usize = 20;

    /// Periods one total-supply checkpoint advances
    pub const SUPPLY_CHECKPOINT_MAX_PERIODS: usize = 20;

    /// Periods one claim walks per account
    pub const CLAIM_MAX_PERIODS: usize = 50;

    /// Fixed batch size of `claim_many`
    pub const CLAIM_MANY_BATCH: usize = 20;

    /// Minimum age of a token checkpoint before `claim` refreshes it
    pub const TOKEN_CHECKPOINT_DEADLINE: u64 = DAY;

    /// Registered reward tokens at any one time
    pub const MAX_REWARD_TOKENS: usize = 10;

    /// Fixed-point scale for block/time interpolation
    pub const BLOCK_SLOPE_SCALE: u128 = 1_000_000_000_000_000_000;
}

pub use constants::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::admin::Ownership;
    pub use crate::clock::{Clock, ManualClock, SharedClock};
    pub use crate::constants::*;
    pub use crate::error::{BoardroomError, Result};
    pub use crate::math::mul_div_floor;
    pub use crate::token::{SharedBank, TokenBank};
    pub use crate::types::*;
}
