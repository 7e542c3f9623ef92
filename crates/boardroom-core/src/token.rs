//! # Token Bank
//!
//! In-memory fungible-token collaborator. Holds any number of tokens, each
//! with balances and allowances keyed by [`AccountId`]. The escrow ledger pulls
//! base tokens through `transfer_from`, and the distributor only observes its
//! own balances and pays out through `transfer`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BoardroomError, Result};
use crate::types::{AccountId, TokenId};

/// Shared handle to a token bank
pub type SharedBank = Arc<RwLock<TokenBank>>;

/// A single fungible token
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FungibleToken {
    /// Display symbol
    pub symbol: String,

    /// Total minted
    pub total_supply: u128,

    balances: HashMap<AccountId, u128>,

    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(AccountId, AccountId), u128>,
}

impl FungibleToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn credit(&mut self, account: &AccountId, amount: u128) -> Result<()> {
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(BoardroomError::Overflow)?;
        Ok(())
    }

    fn move_balance(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(BoardroomError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        // Check the credit side before debiting so a failure changes nothing
        self.balance_of(to)
            .checked_add(amount)
            .ok_or(BoardroomError::Overflow)?;
        self.balances.insert(*from, available - amount);
        self.credit(to, amount)
    }
}

/// Multi-token ledger
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenBank {
    tokens: HashMap<TokenId, FungibleToken>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared bank
    pub fn shared() -> SharedBank {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Register a new token, derived from its symbol
    pub fn create_token(&mut self, symbol: &str) -> Result<TokenId> {
        let id = TokenId::from_symbol(symbol);
        if self.tokens.contains_key(&id) {
            return Err(BoardroomError::AlreadyRegistered(id));
        }
        self.tokens.insert(id, FungibleToken::new(symbol));
        tracing::debug!(token = %id, symbol, "token created");
        Ok(id)
    }

    pub fn token(&self, id: &TokenId) -> Result<&FungibleToken> {
        self.tokens.get(id).ok_or(BoardroomError::UnknownToken(*id))
    }

    fn token_mut(&mut self, id: &TokenId) -> Result<&mut FungibleToken> {
        self.tokens.get_mut(id).ok_or(BoardroomError::UnknownToken(*id))
    }

    /// Mint new units to `to` (funding for tests and simulations)
    pub fn mint(&mut self, token: &TokenId, to: &AccountId, amount: u128) -> Result<()> {
        let tkn = self.token_mut(token)?;
        let supply = tkn
            .total_supply
            .checked_add(amount)
            .ok_or(BoardroomError::Overflow)?;
        tkn.credit(to, amount)?;
        tkn.total_supply = supply;
        Ok(())
    }

    /// Balance of `account`; unknown tokens read as zero
    pub fn balance_of(&self, token: &TokenId, account: &AccountId) -> u128 {
        self.tokens
            .get(token)
            .map(|t| t.balance_of(account))
            .unwrap_or(0)
    }

    pub fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(token)?.move_balance(from, to, amount)
    }

    pub fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(token)?
            .allowances
            .insert((*owner, *spender), amount);
        Ok(())
    }

    pub fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> u128 {
        self.tokens
            .get(token)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or(0)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    pub fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let tkn = self.token_mut(token)?;
        let allowed = tkn.allowance(from, spender);
        if allowed < amount {
            return Err(BoardroomError::InsufficientAllowance {
                required: amount,
                available: allowed,
            });
        }
        tkn.move_balance(from, to, amount)?;
        tkn.allowances.insert((*from, *spender), allowed - amount);
        Ok(())
    }
}
