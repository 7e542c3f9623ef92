//! Core type definitions for the boardroom
//!
//! Identifiers for accounts and tokens, plus the period arithmetic shared by
//! the escrow ledger and the fee distributor.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::PERIOD;

/// Wall-clock seconds since the Unix epoch
pub type Timestamp = u64;

/// Monotonic block height reported by the clock
pub type BlockNumber = u64;

/// AccountId - identifies a holder of tokens, locks and claim cursors
///
/// The zero id is reserved: it never owns a lock and is used as padding in
/// batched claims.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AccountId {
    id: [u8; 32],
}

impl AccountId {
    /// Reserved padding / "no account" id
    pub const ZERO: Self = Self { id: [0u8; 32] };

    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    /// Derive an id from a human readable label using BLAKE3
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn is_zero(&self) -> bool {
        self.id == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self { id })
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// TokenId - identifies a fungible token held in the [`crate::token::TokenBank`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId {
    id: [u8; 32],
}

impl TokenId {
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    /// Derive a token id from its symbol
    pub fn from_symbol(symbol: &str) -> Self {
        let hash = blake3::hash(symbol.as_bytes());
        Self {
            id: *hash.as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// Start of the period containing `t`
pub fn period_floor(t: Timestamp) -> Timestamp {
    t / PERIOD * PERIOD
}

/// Smallest period boundary at or after `t`
pub fn period_ceil(t: Timestamp) -> Timestamp {
    t.div_ceil(PERIOD) * PERIOD
}

/// Whether `t` sits exactly on a period boundary
pub fn is_period_aligned(t: Timestamp) -> bool {
    t % PERIOD == 0
}

/// Index of the period containing `t`
pub fn period_index(t: Timestamp) -> u64 {
    t / PERIOD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_rounding() {
        assert_eq!(period_floor(0), 0);
        assert_eq!(period_floor(PERIOD - 1), 0);
        assert_eq!(period_floor(PERIOD), PERIOD);
        assert_eq!(period_ceil(1), PERIOD);
        assert_eq!(period_ceil(PERIOD), PERIOD);
        assert_eq!(period_index(3 * PERIOD + 5), 3);
        assert!(is_period_aligned(5 * PERIOD));
        assert!(!is_period_aligned(5 * PERIOD + 1));
    }

    proptest::proptest! {
        #[test]
        fn prop_floor_and_ceil_bracket(t in 0u64..10_000_000_000u64) {
            let lo = period_floor(t);
            let hi = period_ceil(t);
            proptest::prop_assert!(lo <= t && t <= hi);
            proptest::prop_assert!(hi - lo == 0 || hi - lo == PERIOD);
            proptest::prop_assert!(is_period_aligned(lo) && is_period_aligned(hi));
        }
    }

    #[test]
    fn test_account_from_label() {
        let alice = AccountId::from_label("alice");
        assert_eq!(alice, AccountId::from_label("alice"));
        assert_ne!(alice, AccountId::from_label("bob"));
        assert!(!alice.is_zero());
        assert!(AccountId::ZERO.is_zero());
    }

    #[test]
    fn test_account_hex_roundtrip() {
        let alice = AccountId::from_label("alice");
        assert_eq!(AccountId::from_hex(&alice.to_hex()).unwrap(), alice);
        assert!(AccountId::from_hex("zz").is_err());
    }
}
