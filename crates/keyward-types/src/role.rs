//! Authority roles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authority category a key can hold, each with its own weight threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Configuration authority: rotation, migration, cancelling recovery
    Owner,
    /// Asset-moving authority: batched call execution
    AssetsOp,
    /// Social recovery authority: proposing a keyset rotation
    Guardian,
}

impl Role {
    /// All roles in canonical order
    pub const ALL: [Role; 3] = [Role::Owner, Role::AssetsOp, Role::Guardian];

    /// Stable tag used in hashed encodings. Never renumber.
    pub fn tag(&self) -> u8 {
        match self {
            Role::Owner => 0,
            Role::AssetsOp => 1,
            Role::Guardian => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::AssetsOp => write!(f, "assets_op"),
            Role::Guardian => write!(f, "guardian"),
        }
    }
}
