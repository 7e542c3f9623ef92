//! # Boardroom Escrow
//!
//! Vote-escrow ledger: accounts lock the base token until a period-aligned
//! unlock time and receive voting power that decays linearly to zero at
//! unlock. The ledger answers "what was the voting power of X (or of
//! everyone) at time T / block B", which the fee distributor relies on.
//!
//! ## Decay
//!
//! For a lock of `amount` ending at `unlock_time`:
//!
//! ```text
//! slope = amount / MAX_LOCK
//! power(t) = slope * (unlock_time - t)     for t < unlock_time, else 0
//! ```

pub mod ledger;
pub mod point;
pub mod source;

pub use ledger::{EscrowState, SharedLedger, VotingEscrow};
pub use point::{HistoricalQuery, Lock, Point};
pub use source::{SharedPowerSource, VotingPowerSource};
