//! Raw secp256k1 signatures

use keyward_crypto::{CryptoResult, RecoverableSignature, Secp256k1KeyPair};
use keyward_types::{CredentialError, IdentityCommitment, H256};
use serde::{Deserialize, Serialize};

use crate::context::VerificationContext;
use crate::credential::VerifyCredential;
use crate::identity::signer_identity;

/// Recoverable signature over the exact message digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    pub signature: RecoverableSignature,
}

impl RawSignature {
    /// Sign `digest` with a key holder's key pair
    pub fn sign(keypair: &Secp256k1KeyPair, digest: &H256) -> CryptoResult<Self> {
        Ok(Self {
            signature: keypair.sign_digest(digest)?,
        })
    }
}

impl VerifyCredential for RawSignature {
    fn verify(
        &self,
        digest: &H256,
        _ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError> {
        // A signature over another digest recovers some other signer; the
        // threshold verifier reports that as an identity mismatch.
        let signer = self
            .signature
            .recover(digest)
            .map_err(|e| CredentialError::bad_signature(e.to_string()))?;
        Ok(signer_identity(&signer))
    }
}
