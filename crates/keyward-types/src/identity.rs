//! Identity commitments
//!
//! Every key in a keyset is referenced by a 32-byte commitment to its
//! kind-specific identity material (an address, an email address plus
//! pepper, an issuer plus subject). The derivations live in
//! `keyward-credentials`; this crate only carries the opaque value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::H256;

/// Commitment to the identity a credential resolves to
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityCommitment(pub H256);

impl IdentityCommitment {
    /// Wrap a raw hash
    pub const fn new(hash: H256) -> Self {
        Self(hash)
    }

    /// The committed hash
    pub fn hash(&self) -> &H256 {
        &self.0
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl From<H256> for IdentityCommitment {
    fn from(hash: H256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for IdentityCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}", self.0)
    }
}

impl fmt::Debug for IdentityCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityCommitment({})", self.0)
    }
}
