//! Key management for Keyward
//!
//! Two key families are in play:
//! - `secp256k1` key pairs identify raw-signature keys and session keys by
//!   their EVM-style address (last 20 bytes of keccak of the public key)
//! - `ed25519` key pairs belong to mail-domain and identity-token issuers
//!   registered with the wallet's registries

use ed25519_dalek::{Signer as _, SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use keyward_types::{Address, H256};
use rand::rngs::OsRng;

use crate::hash::keccak256;
use crate::signature::RecoverableSignature;
use crate::{CryptoError, CryptoResult};

/// Derive the EVM-style address of a secp256k1 public key
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let encoded = verifying_key.to_encoded_point(false);
    // bytes[0] == 0x04 (uncompressed prefix), skip it
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash.0[12..]);
    Address(addr)
}

/// A secp256k1 key pair for raw signatures and session keys
#[derive(Clone)]
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
    address: Address,
}

impl Secp256k1KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Create from existing secret key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Derive a deterministic key pair from a label (stable demo identities)
    pub fn from_label(label: &str) -> CryptoResult<Self> {
        let seed = blake3::derive_key("keyward secp256k1 key v1", label.as_bytes());
        Self::from_bytes(&seed)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Address identifying this key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest directly (no prefixing)
    pub fn sign_digest(&self, digest: &H256) -> CryptoResult<RecoverableSignature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// An ed25519 key pair held by a mail domain or token issuer
#[derive(Clone)]
pub struct Ed25519KeyPair {
    signing_key: Ed25519SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: Ed25519SigningKey::generate(&mut OsRng),
        }
    }

    /// Derive a deterministic key pair from a label
    pub fn from_label(label: &str) -> Self {
        let seed = blake3::derive_key("keyward ed25519 key v1", label.as_bytes());
        Self {
            signing_key: Ed25519SigningKey::from_bytes(&seed),
        }
    }

    /// Public key bytes, as stored in registries
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign arbitrary bytes
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Verify an ed25519 signature against raw public key bytes
pub fn verify_ed25519(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> CryptoResult<()> {
    use ed25519_dalek::Verifier;

    let verifying_key = Ed25519VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
    let signature = ed25519_dalek::Signature::from_bytes(signature);
    verifying_key
        .verify(message, &signature)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}
