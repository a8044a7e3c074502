//! Account migration
//!
//! `SyncAccount` replaces keyset hash, timelock, and implementation pointer
//! together. The new implementation must be on the allow-list; a rejected
//! sync changes nothing, not even the config nonce.

use std::collections::HashSet;

use keyward_types::{Address, WalletError, H256};
use serde::{Deserialize, Serialize};

use crate::recovery::RecoveryStateMachine;

/// Source of truth for implementations a wallet may migrate to
pub trait ImplementationAllowList {
    fn is_allowed(&self, implementation: &Address) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAllowList {
    allowed: HashSet<Address>,
}

impl InMemoryAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, implementation: Address) {
        self.allowed.insert(implementation);
    }

    pub fn revoke(&mut self, implementation: &Address) {
        self.allowed.remove(implementation);
    }
}

impl FromIterator<Address> for InMemoryAllowList {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            allowed: iter.into_iter().collect(),
        }
    }
}

impl ImplementationAllowList for InMemoryAllowList {
    fn is_allowed(&self, implementation: &Address) -> bool {
        self.allowed.contains(implementation)
    }
}

/// Target configuration of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSync {
    pub keyset_hash: H256,
    pub timelock_duration: u64,
    pub implementation: Address,
}

/// Validates syncs against the allow-list and timelock floor
#[derive(Clone, Copy)]
pub struct MigrationController<'a> {
    allow_list: &'a dyn ImplementationAllowList,
}

impl<'a> MigrationController<'a> {
    pub fn new(allow_list: &'a dyn ImplementationAllowList) -> Self {
        Self { allow_list }
    }

    /// Side-effect free validation of `sync`
    pub fn validate(
        &self,
        sync: &AccountSync,
        recovery: &RecoveryStateMachine,
    ) -> Result<(), WalletError> {
        if !self.allow_list.is_allowed(&sync.implementation) {
            return Err(WalletError::UnauthorizedImplementation {
                implementation: sync.implementation,
            });
        }
        recovery.check_timelock(sync.timelock_duration)?;
        Ok(())
    }
}
