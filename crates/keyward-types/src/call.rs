//! Call requests and the executor seam
//!
//! A batch is an ordered list of [`CallRequest`]s. The wallet core never
//! touches balances directly: it drives a [`CallExecutor`] and uses its
//! checkpoints to make individual calls, or a whole batch, atomic.

use serde::{Deserialize, Serialize};

use crate::Address;

/// How a call is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Regular message call from the wallet
    Call,
    /// Execute target code in the wallet's own context
    DelegateCall,
}

impl CallType {
    /// Stable tag used in hashed encodings
    pub fn tag(&self) -> u8 {
        match self {
            CallType::Call => 0,
            CallType::DelegateCall => 1,
        }
    }
}

/// One call in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Account receiving the call
    pub target: Address,
    /// Native value transferred with the call
    pub value: u128,
    /// Call data (empty for plain value transfers)
    #[serde(with = "crate::serde_hex", default)]
    pub data: Vec<u8>,
    /// Gas allowance for this call, 0 = no per-call limit
    #[serde(default)]
    pub gas_limit: u64,
    /// Dispatch mode
    pub call_type: CallType,
    /// Abort and roll back the whole batch if this call fails
    pub revert_on_error: bool,
}

impl CallRequest {
    /// A plain native value transfer that aborts the batch on failure
    pub fn transfer(target: Address, value: u128) -> Self {
        Self {
            target,
            value,
            data: Vec::new(),
            gas_limit: 0,
            call_type: CallType::Call,
            revert_on_error: true,
        }
    }

    /// A call carrying data and no value
    pub fn invoke(target: Address, data: Vec<u8>) -> Self {
        Self {
            target,
            value: 0,
            data,
            gas_limit: 0,
            call_type: CallType::Call,
            revert_on_error: true,
        }
    }

    /// Builder: set revert-on-error
    pub fn with_revert_on_error(mut self, revert_on_error: bool) -> Self {
        self.revert_on_error = revert_on_error;
        self
    }

    /// Builder: set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// Failure of a single call as reported by the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}")]
pub struct CallFailure {
    pub reason: String,
}

impl CallFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Opaque executor state marker returned by [`CallExecutor::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(pub u64);

/// The ledger/chain collaborator that actually performs calls
pub trait CallExecutor {
    /// Mark the current state so it can be restored with [`rollback`](Self::rollback)
    fn checkpoint(&mut self) -> Checkpoint;

    /// Undo every effect applied since `checkpoint`
    fn rollback(&mut self, checkpoint: Checkpoint);

    /// Perform one call on behalf of `from`, returning its output
    fn call(&mut self, from: Address, request: &CallRequest) -> Result<Vec<u8>, CallFailure>;
}
