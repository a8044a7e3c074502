//! Keyward Crypto - Cryptographic primitives for the Keyward wallet engine
//!
//! This crate provides:
//! - Keccak-256 / SHA-256 hashing
//! - Packed, length-prefixed encoding for signed payloads
//! - secp256k1 key pairs with recoverable signatures (EVM-style addresses)
//! - ed25519 key pairs for mail-domain and token issuers
//!
//! The wallet core only ever *verifies*; signing helpers exist for key
//! holders, tooling, and tests.

pub mod hash;
pub mod encoding;
pub mod keys;
pub mod signature;

pub use hash::*;
pub use encoding::*;
pub use keys::*;
pub use signature::*;

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
