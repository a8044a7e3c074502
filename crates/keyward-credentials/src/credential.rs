//! The closed set of credential variants

use keyward_types::{CredentialError, IdentityCommitment, H256};
use serde::{Deserialize, Serialize};

use crate::context::VerificationContext;
use crate::delegated::ContractSignature;
use crate::email::EmailProof;
use crate::id_token::IdentityToken;
use crate::identity::CredentialKind;
use crate::raw::RawSignature;

/// Resolve a credential to the identity that approved `digest`
pub trait VerifyCredential {
    /// Returns the resolved identity, or why the credential does not count.
    /// Never panics on hostile input.
    fn verify(
        &self,
        digest: &H256,
        ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError>;
}

/// Kind-tagged proof bound to a message digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    RawSignature(RawSignature),
    ContractDelegated(ContractSignature),
    EmailDomain(EmailProof),
    IdentityToken(IdentityToken),
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::RawSignature(_) => CredentialKind::RawSignature,
            Credential::ContractDelegated(_) => CredentialKind::ContractDelegated,
            Credential::EmailDomain(_) => CredentialKind::EmailDomain,
            Credential::IdentityToken(_) => CredentialKind::IdentityToken,
        }
    }
}

impl VerifyCredential for Credential {
    fn verify(
        &self,
        digest: &H256,
        ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError> {
        match self {
            Credential::RawSignature(c) => c.verify(digest, ctx),
            Credential::ContractDelegated(c) => c.verify(digest, ctx),
            Credential::EmailDomain(c) => c.verify(digest, ctx),
            Credential::IdentityToken(c) => c.verify(digest, ctx),
        }
    }
}

impl From<RawSignature> for Credential {
    fn from(c: RawSignature) -> Self {
        Credential::RawSignature(c)
    }
}

impl From<ContractSignature> for Credential {
    fn from(c: ContractSignature) -> Self {
        Credential::ContractDelegated(c)
    }
}

impl From<EmailProof> for Credential {
    fn from(c: EmailProof) -> Self {
        Credential::EmailDomain(c)
    }
}

impl From<IdentityToken> for Credential {
    fn from(c: IdentityToken) -> Self {
        Credential::IdentityToken(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_crypto::{keccak256, Secp256k1KeyPair};

    #[test]
    fn test_credential_json_is_kind_tagged() {
        let keypair = Secp256k1KeyPair::from_label("alice").unwrap();
        let credential: Credential = RawSignature::sign(&keypair, &keccak256(b"digest"))
            .unwrap()
            .into();
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["kind"], "raw_signature");

        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back, credential);
        assert_eq!(back.kind(), CredentialKind::RawSignature);
    }
}
