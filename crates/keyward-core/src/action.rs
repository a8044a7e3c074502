//! Wallet actions and their signed digests
//!
//! Every action names the role that must authorize it, the nonce counter it
//! consumes, and a digest binding (chain id, wallet, nonce, action body).

use keyward_crypto::Packed;
use keyward_types::{Address, CallRequest, NonceKind, Role, H256};
use serde::{Deserialize, Serialize};

use crate::config::RoleThresholds;
use crate::migration::AccountSync;

/// Keyset rotation operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum KeysetUpdate {
    /// Guardians lock the wallet pending a new keyset
    Propose {
        new_keyset_hash: H256,
        #[serde(default)]
        immediate: bool,
    },
    /// Owners abandon a pending rotation
    Cancel,
    /// Owners replace the keyset directly
    Rotate { new_keyset_hash: H256 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    UpdateKeysetHash(KeysetUpdate),
    SyncAccount(AccountSync),
    UpdateTimelockDuration { duration: u64 },
    ExecuteBatch { calls: Vec<CallRequest> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::UpdateKeysetHash(KeysetUpdate::Propose { .. }) => "propose_keyset",
            Action::UpdateKeysetHash(KeysetUpdate::Cancel) => "cancel_recovery",
            Action::UpdateKeysetHash(KeysetUpdate::Rotate { .. }) => "rotate_keyset",
            Action::SyncAccount(_) => "sync_account",
            Action::UpdateTimelockDuration { .. } => "update_timelock",
            Action::ExecuteBatch { .. } => "execute_batch",
        }
    }

    pub fn nonce_kind(&self) -> NonceKind {
        match self {
            Action::ExecuteBatch { .. } => NonceKind::Assets,
            _ => NonceKind::Config,
        }
    }

    pub fn required_role(&self) -> Role {
        match self {
            Action::UpdateKeysetHash(KeysetUpdate::Propose { .. }) => Role::Guardian,
            Action::ExecuteBatch { .. } => Role::AssetsOp,
            _ => Role::Owner,
        }
    }

    /// Weight the bundle must reach
    pub fn required_weight(&self, thresholds: &RoleThresholds) -> u64 {
        match self {
            Action::UpdateKeysetHash(KeysetUpdate::Propose {
                immediate: true, ..
            }) => thresholds.guardian_immediate,
            other => thresholds.for_role(other.required_role()),
        }
    }

    /// Digest every credential in the bundle must approve
    pub fn digest(&self, chain_id: u64, wallet: &Address, nonce: u64) -> H256 {
        let packed = Packed::tagged("keyward.action")
            .bytes(self.name().as_bytes())
            .u64(chain_id)
            .address(wallet)
            .u64(nonce);
        match self {
            Action::UpdateKeysetHash(KeysetUpdate::Propose {
                new_keyset_hash,
                immediate,
            }) => packed.h256(new_keyset_hash).bool(*immediate).keccak(),
            Action::UpdateKeysetHash(KeysetUpdate::Cancel) => packed.keccak(),
            Action::UpdateKeysetHash(KeysetUpdate::Rotate { new_keyset_hash }) => {
                packed.h256(new_keyset_hash).keccak()
            }
            Action::SyncAccount(sync) => packed
                .h256(&sync.keyset_hash)
                .u64(sync.timelock_duration)
                .address(&sync.implementation)
                .keccak(),
            Action::UpdateTimelockDuration { duration } => packed.u64(*duration).keccak(),
            Action::ExecuteBatch { calls } => encode_batch(packed, calls).keccak(),
        }
    }
}

fn encode_batch(packed: Packed, calls: &[CallRequest]) -> Packed {
    let count = u32::try_from(calls.len()).unwrap_or(u32::MAX);
    calls.iter().fold(packed.u32(count), |packed, call| {
        packed
            .address(&call.target)
            .u256(call.value)
            .bytes(&call.data)
            .u64(call.gas_limit)
            .u8(call.call_type.tag())
            .bool(call.revert_on_error)
    })
}
