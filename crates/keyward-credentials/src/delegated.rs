//! Contract-delegated signatures
//!
//! The signer is itself a contract wallet. Acceptance is whatever its
//! [`SignerOracle`](crate::SignerOracle) says for (signer, digest, payload).

use keyward_types::{Address, CredentialError, IdentityCommitment, H256};
use serde::{Deserialize, Serialize};

use crate::context::VerificationContext;
use crate::credential::VerifyCredential;
use crate::identity::contract_identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSignature {
    pub signer: Address,
    #[serde(with = "keyward_types::serde_hex")]
    pub payload: Vec<u8>,
}

impl ContractSignature {
    pub fn new(signer: Address, payload: Vec<u8>) -> Self {
        Self { signer, payload }
    }
}

impl VerifyCredential for ContractSignature {
    fn verify(
        &self,
        digest: &H256,
        ctx: &VerificationContext<'_>,
    ) -> Result<IdentityCommitment, CredentialError> {
        if !ctx
            .signer_oracle
            .is_valid_signature(&self.signer, digest, &self.payload)
        {
            return Err(CredentialError::bad_signature(format!(
                "signer {} rejected the payload",
                self.signer
            )));
        }
        Ok(contract_identity(&self.signer))
    }
}
