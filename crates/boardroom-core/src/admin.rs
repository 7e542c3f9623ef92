//! Two-phase ownership
//!
//! The current admin commits a future admin, then applies the transfer.
//! Both steps are admin-only.

use serde::{Deserialize, Serialize};

use crate::error::{BoardroomError, Result};
use crate::types::AccountId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    admin: AccountId,
    future_admin: Option<AccountId>,
}

impl Ownership {
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            future_admin: None,
        }
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.future_admin
    }

    pub fn ensure_admin(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.admin {
            return Err(BoardroomError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Propose `future` as the next admin
    pub fn commit(&mut self, caller: &AccountId, future: AccountId) -> Result<()> {
        self.ensure_admin(caller)?;
        self.future_admin = Some(future);
        tracing::info!(admin = %self.admin, future = %future, "ownership transfer committed");
        Ok(())
    }

    /// Hand over to the committed admin
    pub fn apply(&mut self, caller: &AccountId) -> Result<AccountId> {
        self.ensure_admin(caller)?;
        let future = self.future_admin.ok_or(BoardroomError::NoPendingTransfer)?;
        let old = self.admin;
        self.admin = future;
        self.future_admin = None;
        tracing::info!(old = %old, new = %future, "ownership transferred");
        Ok(future)
    }
}
