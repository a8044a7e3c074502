//! Error types for Keyward
//!
//! Every rejection is a typed value. A failed `submit` leaves the wallet
//! state untouched; callers use [`WalletError::category`] to decide whether
//! to resync, re-sign, or give up.

use thiserror::Error;

use crate::{Address, IdentityCommitment, NonceKind, Role, H256};

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

// ============================================================================
// Credential Errors
// ============================================================================

/// Failure of a single credential to resolve to an identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Signature does not verify against the expected key
    #[error("bad signature: {reason}")]
    BadSignature { reason: String },

    /// Issuer, domain key, or signer is not registered
    #[error("unknown issuer: {issuer}")]
    UnknownIssuer { issuer: String },

    /// Credential or session expired before `now`
    #[error("credential expired at {expired_at} (now {now})")]
    ExpiredCredential { expired_at: u64, now: u64 },

    /// Proof or token could not be parsed
    #[error("malformed proof: {reason}")]
    MalformedProof { reason: String },

    /// External proof verifier rejected the proof
    #[error("proof verification failed: {reason}")]
    ProofVerificationFailed { reason: String },

    /// Credential is valid but commits to a different message digest
    #[error("credential bound to digest {found}, expected {expected}")]
    DigestMismatch { expected: H256, found: String },

    /// Audience or similar attribute is not on the allow-list
    #[error("not allow-listed: {what}")]
    NotAllowListed { what: String },

    /// Credential resolved to a different identity than the one claimed
    #[error("claimed identity {claimed} but credential resolved to {resolved}")]
    IdentityMismatch {
        claimed: IdentityCommitment,
        resolved: IdentityCommitment,
    },
}

impl CredentialError {
    pub fn bad_signature(reason: impl Into<String>) -> Self {
        Self::BadSignature {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedProof {
            reason: reason.into(),
        }
    }

    /// Whether this failure concerns an external proof (surfaced as a proof error)
    pub fn is_proof_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedProof { .. } | Self::ProofVerificationFailed { .. }
        )
    }
}

// ============================================================================
// Authorization Errors
// ============================================================================

/// A signature bundle failed to authorize an action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// One entry failed; the whole bundle is rejected
    #[error("bundle entry {index} rejected: {source}")]
    Credential {
        index: usize,
        #[source]
        source: CredentialError,
    },

    /// Valid, deduplicated, role-matching weight is below the threshold
    #[error("{role} threshold not met: accumulated {accumulated}, required {required}")]
    ThresholdNotMet {
        role: Role,
        accumulated: u64,
        required: u64,
    },

    /// Revealed keyset does not hash to the wallet's current keyset hash
    #[error("keyset hash mismatch: wallet has {expected}, bundle revealed {revealed}")]
    KeysetMismatch { expected: H256, revealed: H256 },
}

// ============================================================================
// Sequencing Errors
// ============================================================================

/// Nonce did not match the ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencingError {
    /// Nonce already consumed; resubmitting as-is can never succeed
    #[error("stale {kind} nonce {presented}: next expected {expected}")]
    StaleNonce {
        kind: NonceKind,
        expected: u64,
        presented: u64,
    },

    /// Nonce skips ahead; resync and resubmit in order
    #[error("future {kind} nonce {presented}: next expected {expected}")]
    FutureNonce {
        kind: NonceKind,
        expected: u64,
        presented: u64,
    },
}

impl SequencingError {
    /// Only a future nonce can succeed later without re-signing
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::FutureNonce { .. })
    }
}

// ============================================================================
// State Errors
// ============================================================================

/// Action is invalid for the current recovery/configuration state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Asset-moving action while a recovery is pending
    #[error("wallet is locked until {unlock_at} (pending keyset {pending_keyset_hash})")]
    Locked {
        pending_keyset_hash: H256,
        unlock_at: u64,
    },

    /// A recovery proposal is already pending
    #[error("a keyset rotation is already pending")]
    AlreadyLocked,

    /// Cancellation requested but nothing is pending
    #[error("no keyset rotation is pending")]
    NotLocked,

    /// Timelock shorter than the configured floor
    #[error("timelock {requested}s is below the minimum {minimum}s")]
    TimelockBelowMinimum { requested: u64, minimum: u64 },

    /// Batch contains no calls
    #[error("empty call batch")]
    EmptyBatch,
}

// ============================================================================
// Execution Errors
// ============================================================================

/// Failure of one call inside an authorized batch
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ExecutionError {
    /// Executor reported a failure for this call
    #[error("call {index} to {target} failed: {reason}")]
    CallFailed {
        index: usize,
        target: Address,
        reason: String,
    },
}

// ============================================================================
// Wallet Errors
// ============================================================================

/// Coarse error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authorization,
    Sequencing,
    State,
    Proof,
    Migration,
}

/// Top-level rejection of a `submit`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("authorization failed: {0}")]
    Authorization(AuthorizationError),

    #[error("sequencing failed: {0}")]
    Sequencing(#[from] SequencingError),

    #[error("invalid state: {0}")]
    State(#[from] StateError),

    /// Malformed or rejected external proof, surfaced verbatim
    #[error("proof rejected in bundle entry {index}: {source}")]
    Proof {
        index: usize,
        #[source]
        source: CredentialError,
    },

    /// Migration target is not on the implementation allow-list
    #[error("implementation {implementation} is not allow-listed")]
    UnauthorizedImplementation { implementation: Address },
}

impl From<AuthorizationError> for WalletError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::Credential { index, source } if source.is_proof_failure() => {
                WalletError::Proof { index, source }
            }
            other => WalletError::Authorization(other),
        }
    }
}

impl WalletError {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authorization(_) => ErrorCategory::Authorization,
            Self::Sequencing(_) => ErrorCategory::Sequencing,
            Self::State(_) => ErrorCategory::State,
            Self::Proof { .. } => ErrorCategory::Proof,
            Self::UnauthorizedImplementation { .. } => ErrorCategory::Migration,
        }
    }

    /// Check if resubmitting (after a resync) could succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Sequencing(err) => err.is_retriable(),
            _ => false,
        }
    }

    /// Get an error code for logs and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authorization(AuthorizationError::Credential { .. }) => "INVALID_CREDENTIAL",
            Self::Authorization(AuthorizationError::ThresholdNotMet { .. }) => "THRESHOLD_NOT_MET",
            Self::Authorization(AuthorizationError::KeysetMismatch { .. }) => "KEYSET_MISMATCH",
            Self::Sequencing(SequencingError::StaleNonce { .. }) => "STALE_NONCE",
            Self::Sequencing(SequencingError::FutureNonce { .. }) => "FUTURE_NONCE",
            Self::State(StateError::Locked { .. }) => "WALLET_LOCKED",
            Self::State(StateError::AlreadyLocked) => "ALREADY_LOCKED",
            Self::State(StateError::NotLocked) => "NOT_LOCKED",
            Self::State(StateError::TimelockBelowMinimum { .. }) => "TIMELOCK_BELOW_MINIMUM",
            Self::State(StateError::EmptyBatch) => "EMPTY_BATCH",
            Self::Proof { .. } => "PROOF_REJECTED",
            Self::UnauthorizedImplementation { .. } => "UNAUTHORIZED_IMPLEMENTATION",
        }
    }
}
