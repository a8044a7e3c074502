//! Recoverable secp256k1 signatures

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use keyward_types::{Address, H256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::keys::address_of;
use crate::{CryptoError, CryptoResult};

/// A 65-byte `r ‖ s ‖ v` signature from which the signer's address can be recovered
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    /// Build from raw bytes
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; 65] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature(format!("expected 65 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    /// Recover the address that signed `digest`
    pub fn recover(&self, digest: &H256) -> CryptoResult<Address> {
        let signature = Signature::from_slice(&self.0[..64])
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

        // Accept both 0/1 and the legacy 27/28 encodings of v
        let v = match self.0[64] {
            27 | 28 => self.0[64] - 27,
            v => v,
        };
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| CryptoError::InvalidSignature(format!("invalid recovery id {v}")))?;

        let verifying_key =
            VerifyingKey::recover_from_prehash(digest.as_bytes(), &signature, recovery_id)
                .map_err(|e| CryptoError::VerificationFailed(e.to_string()))?;
        Ok(address_of(&verifying_key))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}
