//! Verification context
//!
//! Bundles the read-only collaborators and the caller-supplied clock that a
//! credential may consult. Nothing here reads the system time.

use serde::{Deserialize, Serialize};

use crate::registry::{DomainKeyRegistry, IssuerRegistry, ProofVerifier, SignerOracle};

/// Freshness bounds applied to time-sensitive credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPolicy {
    /// Maximum age of an email approval, measured from its `Date` header
    #[serde(default = "default_email_max_age")]
    pub email_max_age_secs: u64,
    /// Tolerated clock drift for timestamps claimed to be in the past
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,
}

fn default_email_max_age() -> u64 {
    86_400 // 24 hours
}

fn default_clock_skew() -> u64 {
    300 // 5 minutes
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            email_max_age_secs: default_email_max_age(),
            clock_skew_secs: default_clock_skew(),
        }
    }
}

/// Everything a verifier may look at besides the credential and digest
#[derive(Clone, Copy)]
pub struct VerificationContext<'a> {
    pub domain_keys: &'a dyn DomainKeyRegistry,
    pub issuers: &'a dyn IssuerRegistry,
    pub signer_oracle: &'a dyn SignerOracle,
    pub proof_verifier: &'a dyn ProofVerifier,
    pub policy: CredentialPolicy,
    /// Unix seconds
    pub now: u64,
}

impl std::fmt::Debug for VerificationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationContext")
            .field("policy", &self.policy)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}
