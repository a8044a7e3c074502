//! Batched call execution
//!
//! Calls run in order against a [`CallExecutor`]. Each call gets its own
//! checkpoint so a failing call never leaves partial effects. A failure with
//! `revert_on_error` additionally rolls back to the batch checkpoint and
//! stops; otherwise the failure is recorded and the batch continues.

use keyward_types::{Address, CallExecutor, CallRequest, ExecutionError, StateError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    pub index: usize,
    pub target: Address,
    pub success: bool,
    #[serde(with = "keyward_types::serde_hex", default)]
    pub output: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

/// Result of a whole batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<CallResult>,
    /// Index of the call whose failure reverted the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<usize>,
}

impl BatchOutcome {
    /// Whether any effects of the batch persist
    pub fn committed(&self) -> bool {
        self.reverted_at.is_none()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExecutionError> {
        self.results.iter().filter_map(|r| r.error.as_ref())
    }
}

pub struct ExecutionEngine;

impl ExecutionEngine {
    /// Structural checks that must pass before a batch consumes a nonce
    pub fn validate(calls: &[CallRequest]) -> Result<(), StateError> {
        if calls.is_empty() {
            return Err(StateError::EmptyBatch);
        }
        Ok(())
    }

    /// Run `calls` from `wallet`. Call failures are data, not errors.
    pub fn run(wallet: Address, calls: &[CallRequest], executor: &mut dyn CallExecutor) -> BatchOutcome {
        let batch_checkpoint = executor.checkpoint();
        let mut outcome = BatchOutcome::default();

        for (index, call) in calls.iter().enumerate() {
            let checkpoint = executor.checkpoint();
            match executor.call(wallet, call) {
                Ok(output) => outcome.results.push(CallResult {
                    index,
                    target: call.target,
                    success: true,
                    output,
                    error: None,
                }),
                Err(failure) => {
                    executor.rollback(checkpoint);
                    debug!(index, target = %call.target, reason = %failure, "call failed");
                    outcome.results.push(CallResult {
                        index,
                        target: call.target,
                        success: false,
                        output: Vec::new(),
                        error: Some(ExecutionError::CallFailed {
                            index,
                            target: call.target,
                            reason: failure.reason,
                        }),
                    });
                    if call.revert_on_error {
                        executor.rollback(batch_checkpoint);
                        outcome.reverted_at = Some(index);
                        break;
                    }
                }
            }
        }
        outcome
    }
}
