//! Shared deployment for the distributor suites

#![allow(dead_code)]

use std::sync::Arc;

use boardroom_core::prelude::*;
use boardroom_distributor::FeeDistributor;
use boardroom_escrow::{SharedLedger, VotingEscrow};

pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Mid-period start so floors and ceilings differ
pub const GENESIS: Timestamp = 2_800 * PERIOD + 2 * DAY + 12_345;

pub struct Deployment {
    pub clock: Arc<ManualClock>,
    pub bank: SharedBank,
    pub base: TokenId,
    pub coin_a: TokenId,
    pub coin_b: TokenId,
    pub coin_c: TokenId,
    pub ledger: SharedLedger,
    pub accounts: Vec<AccountId>,
}

impl Deployment {
    /// Ledger plus three reward coins; `accounts[0]` is admin and holds the
    /// whole base supply
    pub fn new() -> Self {
        let clock = ManualClock::shared(GENESIS);
        let bank = TokenBank::shared();
        let accounts: Vec<_> = (0..5)
            .map(|i| AccountId::from_label(&format!("account-{i}")))
            .collect();

        let (base, coin_a, coin_b, coin_c) = {
            let mut b = bank.write();
            let base = b.create_token("KLONX").unwrap();
            b.mint(&base, &accounts[0], 1_000_000_000_000 * ONE).unwrap();
            (
                base,
                b.create_token("USDA").unwrap(),
                b.create_token("USDB").unwrap(),
                b.create_token("USDC").unwrap(),
            )
        };

        let ledger = VotingEscrow::new(
            accounts[0],
            base,
            AccountId::from_label("ve-klonx"),
            bank.clone(),
            clock.clone(),
        )
        .into_shared();

        let deployment = Self {
            clock,
            bank,
            base,
            coin_a,
            coin_b,
            coin_c,
            ledger,
            accounts,
        };
        for account in &deployment.accounts {
            deployment.approve_escrow(account);
        }
        deployment
    }

    pub fn admin(&self) -> AccountId {
        self.accounts[0]
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn approve_escrow(&self, account: &AccountId) {
        let escrow = self.ledger.read().address();
        self.bank
            .write()
            .approve(&self.base, account, &escrow, u128::MAX)
            .unwrap();
    }

    /// Move base tokens from the admin to `to`
    pub fn fund(&self, to: &AccountId, amount: u128) {
        let admin = self.admin();
        self.bank
            .write()
            .transfer(&self.base, &admin, to, amount)
            .unwrap();
    }

    /// Lock until the period boundary at or before `now + duration`
    pub fn lock(&self, account: &AccountId, amount: u128, duration: u64) -> Timestamp {
        let unlock = period_floor(self.now() + duration);
        self.ledger
            .write()
            .create_lock(account, amount, unlock)
            .unwrap();
        unlock
    }

    /// Distributor with `accounts[0]` as admin
    pub fn distributor(&self, emergency_return: AccountId) -> FeeDistributor {
        FeeDistributor::new(
            self.ledger.clone(),
            AccountId::from_label("ve-boardroom"),
            self.admin(),
            emergency_return,
            self.bank.clone(),
            self.clock.clone(),
        )
    }

    /// Distributor with coins a, c, b registered and c deleted again
    pub fn standard_distributor(&self) -> FeeDistributor {
        let admin = self.admin();
        let mut distributor = self.distributor(admin);
        let now = self.now();
        distributor.add_token(&admin, self.coin_a, now).unwrap();
        distributor.add_token(&admin, self.coin_c, now).unwrap();
        distributor.add_token(&admin, self.coin_b, now).unwrap();
        distributor.delete_token(&admin, &self.coin_c).unwrap();
        distributor
    }

    pub fn mint(&self, token: &TokenId, to: &AccountId, amount: u128) {
        self.bank.write().mint(token, to, amount).unwrap();
    }

    pub fn transfer(&self, token: &TokenId, from: &AccountId, to: &AccountId, amount: u128) {
        self.bank.write().transfer(token, from, to, amount).unwrap();
    }

    pub fn balance(&self, token: &TokenId, account: &AccountId) -> u128 {
        self.bank.read().balance_of(token, account)
    }
}

/// `accounts` followed by zero padding up to the batch size
pub fn batch(accounts: &[AccountId]) -> [AccountId; CLAIM_MANY_BATCH] {
    let mut batch = [AccountId::ZERO; CLAIM_MANY_BATCH];
    batch[..accounts.len()].copy_from_slice(accounts);
    batch
}
