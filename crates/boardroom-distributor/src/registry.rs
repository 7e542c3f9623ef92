//! Reward-token registry
//!
//! Active registrations are kept in insertion order. A deleted token keeps its
//! record and buckets so history stays queryable. Re-adding it takes a new
//! start time but carries the tracked balance and checkpoint time forward, so
//! fees already bucketed are neither attributed twice nor left unaccounted.

use std::collections::HashMap;

use boardroom_core::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bucket::PeriodBuckets;

/// Checkpoint progress of one reward token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardToken {
    pub token: TokenId,

    /// First period eligible for distribution
    pub start_time: Timestamp,

    /// Buckets strictly before this period are final
    pub time_cursor: Timestamp,

    /// Time of the last token checkpoint
    pub last_token_time: Timestamp,

    /// Balance attributed so far and not yet claimed
    pub last_balance: u128,
}

impl RewardToken {
    pub fn new(token: TokenId, start_time: Timestamp) -> Self {
        let start_time = period_floor(start_time);
        Self {
            token,
            start_time,
            time_cursor: start_time,
            last_token_time: start_time,
            last_balance: 0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenRegistry {
    active: IndexMap<TokenId, RewardToken>,
    retired: HashMap<TokenId, RewardToken>,
    buckets: HashMap<TokenId, PeriodBuckets>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, token: TokenId, start_time: Timestamp) -> Result<RewardToken> {
        if self.active.contains_key(&token) {
            return Err(BoardroomError::AlreadyRegistered(token));
        }
        if self.active.len() >= MAX_REWARD_TOKENS {
            return Err(BoardroomError::InvalidState("reward token limit reached"));
        }

        let mut record = RewardToken::new(token, start_time);
        if let Some(retired) = self.retired.remove(&token) {
            record.last_balance = retired.last_balance;
            record.last_token_time = retired.last_token_time;
            record.time_cursor = record.time_cursor.max(retired.time_cursor);
        }
        self.active.insert(token, record);
        self.buckets.entry(token).or_default();
        Ok(record)
    }

    pub fn deregister(&mut self, token: &TokenId) -> Result<RewardToken> {
        let record = self
            .active
            .shift_remove(token)
            .ok_or(BoardroomError::NotRegistered(*token))?;
        self.retired.insert(*token, record);
        Ok(record)
    }

    pub fn is_registered(&self, token: &TokenId) -> bool {
        self.active.contains_key(token)
    }

    /// Active registration
    pub fn get(&self, token: &TokenId) -> Result<&RewardToken> {
        self.active
            .get(token)
            .ok_or(BoardroomError::NotRegistered(*token))
    }

    pub fn get_mut(&mut self, token: &TokenId) -> Result<&mut RewardToken> {
        self.active
            .get_mut(token)
            .ok_or(BoardroomError::NotRegistered(*token))
    }

    /// Active or retired record
    pub fn record(&self, token: &TokenId) -> Option<&RewardToken> {
        self.active.get(token).or_else(|| self.retired.get(token))
    }

    /// Active tokens in registration order
    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> + '_ {
        self.active.keys()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut RewardToken> + '_ {
        self.active.values_mut()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn buckets(&self, token: &TokenId) -> Option<&PeriodBuckets> {
        self.buckets.get(token)
    }

    pub fn buckets_mut(&mut self, token: &TokenId) -> &mut PeriodBuckets {
        self.buckets.entry(*token).or_default()
    }
}
