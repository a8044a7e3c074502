//! KeySet and its commitment
//!
//! A wallet stores only the keyset *hash*. Submissions reveal the full
//! [`KeySet`], which is checked against the stored hash before any
//! credential is looked at.
//!
//! # Invariants
//!
//! 1. Keys are kept in canonical order: ascending `(identity, role)`
//! 2. `(identity, role)` pairs are unique and every weight is positive
//! 3. The hash is a pure function of canonical content

use std::collections::BTreeSet;

use keyward_credentials::{
    contract_identity, email_identity, signer_identity, subject_identity, CredentialKind,
};
use keyward_crypto::Packed;
use keyward_types::{Address, IdentityCommitment, Role, H256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RoleThresholds;

/// Structural problems with a key collection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeysetError {
    #[error("keyset is empty")]
    Empty,

    #[error("key {identity} has zero weight for role {role}")]
    ZeroWeight {
        identity: IdentityCommitment,
        role: Role,
    },

    #[error("key {identity} appears twice with role {role}")]
    DuplicateKey {
        identity: IdentityCommitment,
        role: Role,
    },

    #[error("{role} threshold {required} unreachable: keys hold {available}")]
    ThresholdUnreachable {
        role: Role,
        available: u64,
        required: u64,
    },
}

/// One authorized key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub identity: IdentityCommitment,
    pub kind: CredentialKind,
    pub role: Role,
    pub weight: u32,
}

impl Key {
    pub fn new(identity: IdentityCommitment, kind: CredentialKind, role: Role, weight: u32) -> Self {
        Self {
            identity,
            kind,
            role,
            weight,
        }
    }

    /// Key verified by raw secp256k1 signatures from `signer`
    pub fn raw(signer: &Address, role: Role, weight: u32) -> Self {
        Self::new(signer_identity(signer), CredentialKind::RawSignature, role, weight)
    }

    /// Key verified through a contract signer oracle
    pub fn contract(signer: &Address, role: Role, weight: u32) -> Self {
        Self::new(
            contract_identity(signer),
            CredentialKind::ContractDelegated,
            role,
            weight,
        )
    }

    /// Key verified by email approvals from `email`
    pub fn email(email: &str, pepper: &H256, role: Role, weight: u32) -> Self {
        Self::new(
            email_identity(email, pepper),
            CredentialKind::EmailDomain,
            role,
            weight,
        )
    }

    /// Key verified by identity tokens for `subject` at `issuer`
    pub fn token(issuer: &str, subject: &str, role: Role, weight: u32) -> Self {
        Self::new(
            subject_identity(issuer, subject),
            CredentialKind::IdentityToken,
            role,
            weight,
        )
    }

    fn sort_key(&self) -> (IdentityCommitment, u8) {
        (self.identity, self.role.tag())
    }
}

/// `keccak(tag ‖ count ‖ (role ‖ weight ‖ kind ‖ identity)*)` over the
/// canonical order. Input order does not matter.
pub fn compute_keyset_hash(keys: &[Key]) -> H256 {
    let mut sorted = keys.to_vec();
    sorted.sort_by_key(Key::sort_key);

    let count = u32::try_from(sorted.len()).unwrap_or(u32::MAX);
    sorted
        .iter()
        .fold(
            Packed::tagged("keyward.keyset").u32(count),
            |packed, key| {
                packed
                    .u8(key.role.tag())
                    .u32(key.weight)
                    .u8(key.kind.tag())
                    .h256(key.identity.hash())
            },
        )
        .keccak()
}

/// Canonical, validated key collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Key>", into = "Vec<Key>")]
pub struct KeySet {
    keys: Vec<Key>,
}

impl KeySet {
    /// Canonicalize and validate
    pub fn new(mut keys: Vec<Key>) -> Result<Self, KeysetError> {
        if keys.is_empty() {
            return Err(KeysetError::Empty);
        }
        keys.sort_by_key(Key::sort_key);

        let mut seen = BTreeSet::new();
        for key in &keys {
            if key.weight == 0 {
                return Err(KeysetError::ZeroWeight {
                    identity: key.identity,
                    role: key.role,
                });
            }
            if !seen.insert(key.sort_key()) {
                return Err(KeysetError::DuplicateKey {
                    identity: key.identity,
                    role: key.role,
                });
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn hash(&self) -> H256 {
        compute_keyset_hash(&self.keys)
    }

    /// The key for `identity` holding `role`, if any
    pub fn find(&self, identity: &IdentityCommitment, role: Role) -> Option<&Key> {
        self.keys
            .binary_search_by_key(&(*identity, role.tag()), Key::sort_key)
            .ok()
            .map(|index| &self.keys[index])
    }

    /// Total weight of keys holding `role`
    pub fn weight_of(&self, role: Role) -> u64 {
        self.keys
            .iter()
            .filter(|key| key.role == role)
            .map(|key| u64::from(key.weight))
            .sum()
    }

    /// Check that every role threshold is reachable by this keyset
    pub fn validate_thresholds(&self, thresholds: &RoleThresholds) -> Result<(), KeysetError> {
        let checks = Role::ALL
            .iter()
            .map(|role| (*role, thresholds.for_role(*role)))
            .chain(std::iter::once((Role::Guardian, thresholds.guardian_immediate)));
        for (role, required) in checks {
            let available = self.weight_of(role);
            if available < required {
                return Err(KeysetError::ThresholdUnreachable {
                    role,
                    available,
                    required,
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Key>> for KeySet {
    type Error = KeysetError;

    fn try_from(keys: Vec<Key>) -> Result<Self, Self::Error> {
        Self::new(keys)
    }
}

impl From<KeySet> for Vec<Key> {
    fn from(keyset: KeySet) -> Self {
        keyset.keys
    }
}
