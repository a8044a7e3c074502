//! Keyward Types - Canonical domain types for the Keyward wallet engine
//!
//! This crate contains the foundational types with zero dependencies on other
//! keyward crates:
//!
//! - Fixed-width primitives (`Address`, `H256`) and identity commitments
//! - Roles and nonce classes
//! - Call requests and the `CallExecutor` seam
//! - The error taxonomy shared by every layer
//!
//! # Invariants
//!
//! 1. A wallet's behavior is fully determined by its implementation and keyset hash
//! 2. Every state change is the result of exactly one authorized submission
//! 3. Fail closed: any invalid credential rejects the whole bundle

pub mod primitives;
pub mod identity;
pub mod role;
pub mod call;
pub mod error;
pub mod serde_hex;

pub use primitives::*;
pub use identity::*;
pub use role::*;
pub use call::*;
pub use error::*;

use serde::{Deserialize, Serialize};

/// Version of the Keyward types schema
pub const TYPES_VERSION: &str = "0.1.0";

/// Replay counter class consumed by an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonceKind {
    /// Asset-moving actions (batched execution)
    Assets,
    /// Configuration actions (recovery, migration, timelock)
    Config,
}

impl std::fmt::Display for NonceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonceKind::Assets => write!(f, "assets"),
            NonceKind::Config => write!(f, "config"),
        }
    }
}
