//! Keyward Core - Authorization and recovery engine for smart-contract wallets
//!
//! This crate implements what a wallet instance runs internally:
//! - KeySet: canonical, content-hashed set of weighted, role-bearing keys
//! - ThresholdVerifier: role-weighted decision over a signature bundle
//! - NonceLedger: independent replay counters for assets and configuration
//! - RecoveryStateMachine: guardian lock, timelocked rotation, owner cancel
//! - ExecutionEngine: batched calls with per-call and per-batch atomicity
//! - MigrationController: allow-listed implementation + keyset + timelock sync
//!
//! # Architectural Invariants
//!
//! 1. A wallet's behavior is determined by (implementation, keyset hash)
//! 2. State changes only through one authorized `submit` (or lazy settlement)
//! 3. A rejected submission changes nothing
//! 4. Fail closed: one invalid credential rejects the whole bundle
//! 5. Time is always an explicit parameter

pub mod config;
pub mod keyset;
pub mod threshold;
pub mod nonce;
pub mod recovery;
pub mod action;
pub mod execution;
pub mod migration;
pub mod factory;
pub mod wallet;

pub use config::*;
pub use keyset::*;
pub use threshold::*;
pub use nonce::*;
pub use recovery::*;
pub use action::*;
pub use execution::*;
pub use migration::*;
pub use factory::*;
pub use wallet::*;
