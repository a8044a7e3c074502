//! Packed binary encoding for hashed payloads
//!
//! Fixed-width integers are big-endian. Variable-length fields are
//! length-prefixed with a u32 so that adjacent fields can never be
//! re-split into a different tuple with the same bytes.

use keyward_types::{Address, H256};

use crate::hash::keccak256;

/// Builder for packed, hash-ready byte strings
#[derive(Debug, Default, Clone)]
pub struct Packed {
    buf: Vec<u8>,
}

impl Packed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a domain-separation tag
    pub fn tagged(tag: &str) -> Self {
        Self::new().bytes(tag.as_bytes())
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// 256-bit big-endian word, like an EVM `uint256`
    pub fn u256(mut self, value: u128) -> Self {
        self.buf.extend_from_slice(&[0u8; 16]);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bool(self, value: bool) -> Self {
        self.u8(u8::from(value))
    }

    pub fn address(mut self, value: &Address) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn h256(mut self, value: &H256) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Length-prefixed bytes
    pub fn bytes(mut self, value: &[u8]) -> Self {
        let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Keccak-256 of the encoded bytes
    pub fn keccak(&self) -> H256 {
        keccak256(&self.buf)
    }
}
