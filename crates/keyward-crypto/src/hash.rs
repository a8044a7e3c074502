//! Hashing utilities for Keyward
//!
//! Keccak-256 is the commitment hash for everything the wallet signs or
//! stores. SHA-256 is only used for email header digests.

use keyward_types::H256;
use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// Compute Keccak-256 of data
pub fn keccak256(data: &[u8]) -> H256 {
    H256(Keccak256::digest(data).into())
}

/// Compute Keccak-256 over the concatenation of several items
pub fn keccak256_all(items: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for item in items {
        hasher.update(item);
    }
    H256(hasher.finalize().into())
}

/// Compute SHA-256 of data
pub fn sha256(data: &[u8]) -> H256 {
    H256(Sha256::digest(data).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty_vector() {
        // Well-known Keccak-256 of the empty string
        assert_eq!(
            keccak256(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak_all_matches_concatenation() {
        let joined = keccak256(b"keyward-wallet");
        let parts = keccak256_all(&[b"keyward", b"-", b"wallet"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn test_sha256_differs_from_keccak() {
        assert_ne!(sha256(b"abc"), keccak256(b"abc"));
        assert_eq!(
            sha256(b"abc").to_hex(),
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
