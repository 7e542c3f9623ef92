//! Error types for boardroom operations

use crate::types::{AccountId, TokenId};
use thiserror::Error;

/// Result type alias for boardroom operations
pub type Result<T> = std::result::Result<T, BoardroomError>;

/// Errors that can occur in escrow, distributor and collaborator operations
///
/// Every failing call leaves the state it was invoked on untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardroomError {
    // === Lock / registration state ===
    /// Operation is not valid for the current lock or registration state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Amount outside the permitted domain
    #[error("Invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// Unlock time outside the permitted domain
    #[error("Invalid duration: {0}")]
    InvalidDuration(&'static str),

    // === Access control ===
    /// Admin-only operation called by someone else
    #[error("Unauthorized caller: {0}")]
    Unauthorized(AccountId),

    /// Claims are disabled once the distributor has been killed
    #[error("Distributor has been killed")]
    Killed,

    /// Ownership apply without a prior commit
    #[error("No pending ownership transfer")]
    NoPendingTransfer,

    // === Token registry ===
    #[error("Token already registered: {0}")]
    AlreadyRegistered(TokenId),

    #[error("Token not registered: {0}")]
    NotRegistered(TokenId),

    // === Token bank ===
    #[error("Unknown token: {0}")]
    UnknownToken(TokenId),

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u128, available: u128 },

    #[error("Insufficient allowance: need {required}, have {available}")]
    InsufficientAllowance { required: u128, available: u128 },

    // === General ===
    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,

    /// State (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BoardroomError {
    /// Stable numeric code for reporting
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidState(_) => 1001,
            Self::InvalidAmount(_) => 1002,
            Self::InvalidDuration(_) => 1003,
            Self::Unauthorized(_) => 1004,
            Self::Killed => 1005,
            Self::NoPendingTransfer => 1006,
            Self::AlreadyRegistered(_) => 1007,
            Self::NotRegistered(_) => 1008,
            Self::UnknownToken(_) => 2001,
            Self::InsufficientBalance { .. } => 2002,
            Self::InsufficientAllowance { .. } => 2003,
            _ => 9999,
        }
    }

    /// Check if the caller can reasonably retry after changing its inputs or
    /// funding (as opposed to a permanent condition such as a kill)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. } | Self::InsufficientAllowance { .. }
        )
    }
}

impl From<bincode::Error> for BoardroomError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
