//! Threshold verification
//!
//! Turns a signature bundle into an authorization decision for one role.
//!
//! # Rules
//!
//! 1. Fail closed: any entry whose credential does not verify, or resolves
//!    to an identity other than the one it claims, rejects the whole bundle
//! 2. Only identities holding the required role in the revealed keyset count
//! 3. Each identity counts once (its largest contribution)
//! 4. A session contributes `min(delegated weight, delegating key weight)`
//! 5. `accumulated >= required` succeeds

use std::collections::BTreeMap;

use keyward_credentials::{Credential, SessionDelegation, VerificationContext, VerifyCredential};
use keyward_types::{AuthorizationError, CredentialError, IdentityCommitment, Role, H256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keyset::KeySet;

/// One approval in a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Identity this entry claims to be
    pub identity: IdentityCommitment,
    pub credential: Credential,
    /// Present when the credential delegates to a session key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDelegation>,
}

impl BundleEntry {
    pub fn new(identity: IdentityCommitment, credential: impl Into<Credential>) -> Self {
        Self {
            identity,
            credential: credential.into(),
            session: None,
        }
    }

    /// Entry whose credential signs the session permit instead of the digest
    pub fn delegated(
        identity: IdentityCommitment,
        credential: impl Into<Credential>,
        session: SessionDelegation,
    ) -> Self {
        Self {
            identity,
            credential: credential.into(),
            session: Some(session),
        }
    }
}

/// Ordered approvals for one action digest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    pub entries: Vec<BundleEntry>,
}

impl SignatureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an entry
    pub fn with(mut self, entry: BundleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<BundleEntry> for SignatureBundle {
    fn from_iter<I: IntoIterator<Item = BundleEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Successful authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub role: Role,
    /// Deduplicated weight that counted
    pub weight: u64,
    pub required: u64,
    /// Identities that contributed weight, in canonical order
    pub signers: Vec<IdentityCommitment>,
}

/// Aggregates verified credentials into a role-weighted decision
#[derive(Debug, Clone, Copy)]
pub struct ThresholdVerifier<'a> {
    ctx: VerificationContext<'a>,
}

impl<'a> ThresholdVerifier<'a> {
    pub fn new(ctx: VerificationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Verify `bundle` as authorization by `role` over `digest`
    pub fn verify_bundle(
        &self,
        bundle: &SignatureBundle,
        role: Role,
        required: u64,
        keyset: &KeySet,
        digest: &H256,
    ) -> Result<Authorization, AuthorizationError> {
        let mut contributions: BTreeMap<IdentityCommitment, u64> = BTreeMap::new();

        for (index, entry) in bundle.entries.iter().enumerate() {
            let reject = |source: CredentialError| AuthorizationError::Credential { index, source };

            let signed_digest = match &entry.session {
                Some(session) => {
                    session.verify(digest, self.ctx.now).map_err(reject)?;
                    session.permit_digest(digest)
                }
                None => *digest,
            };

            let resolved = entry
                .credential
                .verify(&signed_digest, &self.ctx)
                .map_err(reject)?;
            if resolved != entry.identity {
                return Err(reject(CredentialError::IdentityMismatch {
                    claimed: entry.identity,
                    resolved,
                }));
            }

            let Some(key) = keyset.find(&resolved, role) else {
                debug!(index, identity = %resolved, %role, "entry does not hold role, not counted");
                continue;
            };
            if key.kind != entry.credential.kind() {
                debug!(index, identity = %resolved, "credential kind differs from key kind, not counted");
                continue;
            }

            let weight = match &entry.session {
                Some(session) => u64::from(session.weight.min(key.weight)),
                None => u64::from(key.weight),
            };
            debug!(index, identity = %resolved, %role, weight, "entry verified");

            let slot = contributions.entry(resolved).or_insert(0);
            *slot = (*slot).max(weight);
        }

        let accumulated: u64 = contributions.values().sum();
        // No contributing signer never authorizes, whatever `required` is.
        if contributions.is_empty() || accumulated < required {
            return Err(AuthorizationError::ThresholdNotMet {
                role,
                accumulated,
                required,
            });
        }

        Ok(Authorization {
            role,
            weight: accumulated,
            required,
            signers: contributions.into_keys().collect(),
        })
    }
}
