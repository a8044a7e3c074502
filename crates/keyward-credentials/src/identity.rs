//! Kind-specific identity commitments
//!
//! Each credential kind commits to different identity material. Every
//! derivation is domain-separated by kind so the same address used as a raw
//! signer and as a contract signer yields two distinct identities.

use keyward_crypto::Packed;
use keyward_types::{Address, IdentityCommitment, H256};
use serde::{Deserialize, Serialize};

/// Closed set of credential kinds a key can be verified with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// secp256k1 recoverable signature
    RawSignature,
    /// Acceptance delegated to a signer oracle (contract wallet)
    ContractDelegated,
    /// Mail-domain signed header plus succinct proof
    EmailDomain,
    /// Issuer-signed identity token
    IdentityToken,
}

impl CredentialKind {
    /// Stable tag used in hashed encodings. Never renumber.
    pub fn tag(&self) -> u8 {
        match self {
            CredentialKind::RawSignature => 0,
            CredentialKind::ContractDelegated => 1,
            CredentialKind::EmailDomain => 2,
            CredentialKind::IdentityToken => 3,
        }
    }
}

/// Identity of a raw secp256k1 signer
pub fn signer_identity(address: &Address) -> IdentityCommitment {
    IdentityCommitment::new(
        Packed::tagged("keyward.identity.signer")
            .address(address)
            .keccak(),
    )
}

/// Identity of a contract-delegated signer
pub fn contract_identity(address: &Address) -> IdentityCommitment {
    IdentityCommitment::new(
        Packed::tagged("keyward.identity.contract")
            .address(address)
            .keccak(),
    )
}

/// Identity of an email address, salted with a per-key pepper.
/// Addresses compare case-insensitively.
pub fn email_identity(email: &str, pepper: &H256) -> IdentityCommitment {
    IdentityCommitment::new(
        Packed::tagged("keyward.identity.email")
            .bytes(email.trim().to_ascii_lowercase().as_bytes())
            .h256(pepper)
            .keccak(),
    )
}

/// Identity of a token subject at a given issuer
pub fn subject_identity(issuer: &str, subject: &str) -> IdentityCommitment {
    IdentityCommitment::new(
        Packed::tagged("keyward.identity.subject")
            .bytes(issuer.as_bytes())
            .bytes(subject.as_bytes())
            .keccak(),
    )
}
