//! The wallet state record and its single mutation path
//!
//! A [`Wallet`] owns its keyset hash, nonce ledger, recovery state, timelock
//! duration, and implementation pointer. All of them change only through
//! [`Wallet::submit`] (plus the lazy settlement in [`Wallet::poll`]).
//!
//! # Submit pipeline
//!
//! 1. Settle a matured recovery (`poll(now)`)
//! 2. Revealed keyset must hash to the stored keyset hash
//! 3. Nonce must be exactly the next one for the action's counter
//! 4. Bundle must reach the action's role threshold over the action digest
//! 5. The action's effect must be valid in the current state
//! 6. Consume the nonce, apply the effect
//!
//! Steps 2-5 write nothing, so a rejected submission leaves the wallet as it
//! was after step 1.

use keyward_credentials::{
    CredentialPolicy, DomainKeyRegistry, IssuerRegistry, ProofVerifier, SignerOracle,
    VerificationContext,
};
use keyward_types::{
    Address, AuthorizationError, CallExecutor, NonceKind, Result, H256,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::action::{Action, KeysetUpdate};
use crate::config::{ConfigError, RoleThresholds, WalletConfig};
use crate::execution::{BatchOutcome, ExecutionEngine};
use crate::keyset::KeySet;
use crate::migration::{ImplementationAllowList, MigrationController};
use crate::nonce::NonceLedger;
use crate::recovery::{LockInfo, RecoveryStateMachine};
use crate::threshold::{Authorization, SignatureBundle, ThresholdVerifier};

/// Collaborators a submission may consult or drive
pub struct Environment<'a> {
    pub domain_keys: &'a dyn DomainKeyRegistry,
    pub issuers: &'a dyn IssuerRegistry,
    pub signer_oracle: &'a dyn SignerOracle,
    pub proof_verifier: &'a dyn ProofVerifier,
    pub allow_list: &'a dyn ImplementationAllowList,
    pub executor: &'a mut dyn CallExecutor,
}

/// An action plus everything needed to authorize it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub action: Action,
    pub nonce: u64,
    /// Full keyset matching the wallet's stored hash
    pub keyset: KeySet,
    pub bundle: SignatureBundle,
}

/// What a committed action changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StateDelta {
    RecoveryProposed {
        pending_keyset_hash: H256,
        unlock_at: u64,
        immediate: bool,
    },
    RecoveryCancelled {
        pending_keyset_hash: H256,
    },
    /// A matured recovery replaced the keyset
    RecoverySettled {
        previous: H256,
        current: H256,
    },
    KeysetRotated {
        previous: H256,
        current: H256,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleared_pending: Option<H256>,
    },
    AccountSynced {
        keyset_hash: H256,
        timelock_duration: u64,
        implementation: Address,
        previous_implementation: Address,
    },
    TimelockUpdated {
        previous: u64,
        current: u64,
    },
    BatchExecuted(BatchOutcome),
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub action: String,
    pub nonce_kind: NonceKind,
    /// Nonce now stored for `nonce_kind`
    pub nonce: u64,
    pub authorization: Authorization,
    /// Recovery settled by this submission's poll, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled: Option<StateDelta>,
    pub delta: StateDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    address: Address,
    chain_id: u64,
    keyset_hash: H256,
    implementation: Address,
    nonces: NonceLedger,
    recovery: RecoveryStateMachine,
    thresholds: RoleThresholds,
    credential_policy: CredentialPolicy,
}

impl Wallet {
    /// Fresh wallet record; fails on a config that [`WalletConfig::validate`] rejects
    pub fn new(
        address: Address,
        keyset_hash: H256,
        implementation: Address,
        config: &WalletConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            address,
            chain_id: config.chain_id,
            keyset_hash,
            implementation,
            nonces: NonceLedger::new(),
            recovery: RecoveryStateMachine::new(
                config.timelock.default_duration_secs,
                config.timelock.min_duration_secs,
            ),
            thresholds: config.thresholds,
            credential_policy: config.credentials,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn keyset_hash(&self) -> H256 {
        self.keyset_hash
    }

    pub fn implementation(&self) -> Address {
        self.implementation
    }

    pub fn timelock_duration(&self) -> u64 {
        self.recovery.timelock_duration()
    }

    pub fn thresholds(&self) -> &RoleThresholds {
        &self.thresholds
    }

    pub fn lock_info(&self) -> LockInfo {
        self.recovery.lock_info()
    }

    /// Last consumed nonce of `kind`
    pub fn nonce(&self, kind: NonceKind) -> u64 {
        self.nonces.current(kind)
    }

    /// Nonce the next `kind` submission must carry
    pub fn next_nonce(&self, kind: NonceKind) -> u64 {
        self.nonces.next(kind)
    }

    /// Digest signers must approve for `action` at `nonce`
    pub fn digest_for(&self, action: &Action, nonce: u64) -> H256 {
        action.digest(self.chain_id, &self.address, nonce)
    }

    /// Settle a matured recovery, if any
    pub fn poll(&mut self, now: u64) -> Option<StateDelta> {
        let current = self.recovery.settle(now)?;
        let previous = std::mem::replace(&mut self.keyset_hash, current);
        info!(wallet = %self.address, %previous, %current, "recovery settled, keyset replaced");
        Some(StateDelta::RecoverySettled { previous, current })
    }

    /// Authorize and apply one action atomically
    pub fn submit(
        &mut self,
        submission: &Submission,
        env: &mut Environment<'_>,
        now: u64,
    ) -> Result<SubmitReceipt> {
        let settled = self.poll(now);
        match self.authorize_and_apply(submission, env, now) {
            Ok(mut receipt) => {
                receipt.settled = settled;
                info!(
                    wallet = %self.address,
                    action = %receipt.action,
                    nonce_kind = %receipt.nonce_kind,
                    nonce = receipt.nonce,
                    weight = receipt.authorization.weight,
                    "submission committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    wallet = %self.address,
                    action = submission.action.name(),
                    code = err.error_code(),
                    error = %err,
                    "submission rejected"
                );
                Err(err)
            }
        }
    }

    fn authorize_and_apply(
        &mut self,
        submission: &Submission,
        env: &mut Environment<'_>,
        now: u64,
    ) -> Result<SubmitReceipt> {
        let revealed = submission.keyset.hash();
        if revealed != self.keyset_hash {
            return Err(AuthorizationError::KeysetMismatch {
                expected: self.keyset_hash,
                revealed,
            }
            .into());
        }

        let action = &submission.action;
        let nonce_kind = action.nonce_kind();
        self.nonces.check(nonce_kind, submission.nonce)?;

        let digest = self.digest_for(action, submission.nonce);
        let ctx = VerificationContext {
            domain_keys: env.domain_keys,
            issuers: env.issuers,
            signer_oracle: env.signer_oracle,
            proof_verifier: env.proof_verifier,
            policy: self.credential_policy,
            now,
        };
        let authorization = ThresholdVerifier::new(ctx).verify_bundle(
            &submission.bundle,
            action.required_role(),
            action.required_weight(&self.thresholds),
            &submission.keyset,
            &digest,
        )?;

        self.validate_effect(action, env)?;

        // Everything below is validated: no early return may follow
        let nonce = self.nonces.consume(nonce_kind, submission.nonce)?;
        let delta = self.apply(action, env, now)?;

        Ok(SubmitReceipt {
            action: action.name().to_string(),
            nonce_kind,
            nonce,
            authorization,
            settled: None,
            delta,
        })
    }

    fn validate_effect(&self, action: &Action, env: &Environment<'_>) -> Result<()> {
        match action {
            Action::UpdateKeysetHash(KeysetUpdate::Propose { .. }) => self.recovery.check_propose()?,
            Action::UpdateKeysetHash(KeysetUpdate::Cancel) => self.recovery.check_cancel()?,
            Action::UpdateKeysetHash(KeysetUpdate::Rotate { .. }) => {}
            Action::SyncAccount(sync) => {
                MigrationController::new(env.allow_list).validate(sync, &self.recovery)?
            }
            Action::UpdateTimelockDuration { duration } => self.recovery.check_timelock(*duration)?,
            Action::ExecuteBatch { calls } => {
                self.recovery.check_unlocked()?;
                ExecutionEngine::validate(calls)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, action: &Action, env: &mut Environment<'_>, now: u64) -> Result<StateDelta> {
        let delta = match action {
            Action::UpdateKeysetHash(KeysetUpdate::Propose {
                new_keyset_hash,
                immediate,
            }) => {
                let unlock_at = self.recovery.propose(*new_keyset_hash, *immediate, now)?;
                StateDelta::RecoveryProposed {
                    pending_keyset_hash: *new_keyset_hash,
                    unlock_at,
                    immediate: *immediate,
                }
            }
            Action::UpdateKeysetHash(KeysetUpdate::Cancel) => StateDelta::RecoveryCancelled {
                pending_keyset_hash: self.recovery.cancel()?,
            },
            Action::UpdateKeysetHash(KeysetUpdate::Rotate { new_keyset_hash }) => {
                let cleared_pending = self.recovery.clear();
                let previous = std::mem::replace(&mut self.keyset_hash, *new_keyset_hash);
                StateDelta::KeysetRotated {
                    previous,
                    current: *new_keyset_hash,
                    cleared_pending,
                }
            }
            Action::SyncAccount(sync) => {
                self.recovery.set_timelock_duration(sync.timelock_duration)?;
                self.recovery.clear();
                self.keyset_hash = sync.keyset_hash;
                let previous_implementation =
                    std::mem::replace(&mut self.implementation, sync.implementation);
                StateDelta::AccountSynced {
                    keyset_hash: sync.keyset_hash,
                    timelock_duration: sync.timelock_duration,
                    implementation: sync.implementation,
                    previous_implementation,
                }
            }
            Action::UpdateTimelockDuration { duration } => StateDelta::TimelockUpdated {
                previous: self.recovery.set_timelock_duration(*duration)?,
                current: *duration,
            },
            Action::ExecuteBatch { calls } => {
                StateDelta::BatchExecuted(ExecutionEngine::run(self.address, calls, &mut *env.executor))
            }
        };
        Ok(delta)
    }
}
