//! Session-key delegation
//!
//! A keyset member can hand a short-lived secp256k1 session key part of its
//! weight. The member's credential signs the *permit digest* (which commits to
//! the action digest, the session address, expiry, and weight) and the
//! session key signs the action digest itself. Sessions live only inside a
//! bundle and are never stored.

use keyward_crypto::{CryptoResult, Packed, RecoverableSignature, Secp256k1KeyPair};
use keyward_types::{Address, CredentialError, H256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDelegation {
    /// Address of the session key
    pub session_key: Address,
    /// Unix seconds; valid strictly before
    pub expiry: u64,
    /// Weight delegated, capped by the delegating key's own weight
    pub weight: u32,
    /// Session key's signature over the action digest
    pub signature: RecoverableSignature,
}

impl SessionDelegation {
    /// Create a delegation for one action digest, signed by the session key
    pub fn sign(
        session: &Secp256k1KeyPair,
        expiry: u64,
        weight: u32,
        digest: &H256,
    ) -> CryptoResult<Self> {
        Ok(Self {
            session_key: session.address(),
            expiry,
            weight,
            signature: session.sign_digest(digest)?,
        })
    }

    /// Digest the delegating credential must sign
    pub fn permit_digest(&self, digest: &H256) -> H256 {
        permit_digest(digest, &self.session_key, self.expiry, self.weight)
    }

    /// Check expiry, then the session key's own signature over `digest`
    pub fn verify(&self, digest: &H256, now: u64) -> Result<(), CredentialError> {
        if now >= self.expiry {
            return Err(CredentialError::ExpiredCredential {
                expired_at: self.expiry,
                now,
            });
        }
        let signer = self
            .signature
            .recover(digest)
            .map_err(|e| CredentialError::bad_signature(e.to_string()))?;
        if signer != self.session_key {
            return Err(CredentialError::bad_signature(format!(
                "session signature recovered {signer}, expected {}",
                self.session_key
            )));
        }
        Ok(())
    }
}

/// `keccak(tag ‖ digest ‖ session address ‖ expiry ‖ weight)`
pub fn permit_digest(digest: &H256, session_key: &Address, expiry: u64, weight: u32) -> H256 {
    Packed::tagged("keyward.session.permit")
        .h256(digest)
        .address(session_key)
        .u64(expiry)
        .u32(weight)
        .keccak()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_crypto::keccak256;

    #[test]
    fn test_session_valid_strictly_before_expiry() {
        let session = Secp256k1KeyPair::from_label("session").unwrap();
        let digest = keccak256(b"batch");
        let delegation = SessionDelegation::sign(&session, 1_000, 100, &digest).unwrap();

        assert!(delegation.verify(&digest, 999).is_ok());
        assert_eq!(
            delegation.verify(&digest, 1_000),
            Err(CredentialError::ExpiredCredential {
                expired_at: 1_000,
                now: 1_000
            })
        );
    }

    #[test]
    fn test_session_signature_binds_digest() {
        let session = Secp256k1KeyPair::from_label("session").unwrap();
        let delegation = SessionDelegation::sign(&session, 1_000, 100, &keccak256(b"batch")).unwrap();
        assert!(matches!(
            delegation.verify(&keccak256(b"other batch"), 10),
            Err(CredentialError::BadSignature { .. })
        ));
    }

    #[test]
    fn test_permit_commits_to_every_field() {
        let digest = keccak256(b"batch");
        let key = Address([1; 20]);
        let base = permit_digest(&digest, &key, 1_000, 100);
        assert_ne!(base, permit_digest(&digest, &key, 1_001, 100));
        assert_ne!(base, permit_digest(&digest, &key, 1_000, 99));
        assert_ne!(base, permit_digest(&digest, &Address([2; 20]), 1_000, 100));
        assert_ne!(base, permit_digest(&keccak256(b"x"), &key, 1_000, 100));
    }
}
