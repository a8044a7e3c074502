//! Wallet configuration
//!
//! Every field has a serde default so partial configuration files work.

use keyward_credentials::CredentialPolicy;
use keyward_types::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration problems detected by [`WalletConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{role} threshold must be positive")]
    ZeroThreshold { role: Role },

    #[error("immediate guardian threshold {immediate} is below the timelocked one {timelocked}")]
    ImmediateBelowTimelocked { immediate: u64, timelocked: u64 },

    #[error("default timelock {default}s is below the minimum {minimum}s")]
    DefaultTimelockBelowMinimum { default: u64, minimum: u64 },
}

/// Minimum aggregate weight per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleThresholds {
    #[serde(default = "default_owner")]
    pub owner: u64,
    #[serde(default = "default_assets_op")]
    pub assets_op: u64,
    /// Guardian weight to propose a timelocked rotation
    #[serde(default = "default_guardian")]
    pub guardian: u64,
    /// Guardian weight to propose a rotation that skips the timelock
    #[serde(default = "default_guardian_immediate")]
    pub guardian_immediate: u64,
}

fn default_owner() -> u64 {
    100
}

fn default_assets_op() -> u64 {
    100
}

fn default_guardian() -> u64 {
    50
}

fn default_guardian_immediate() -> u64 {
    100
}

impl Default for RoleThresholds {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            assets_op: default_assets_op(),
            guardian: default_guardian(),
            guardian_immediate: default_guardian_immediate(),
        }
    }
}

impl RoleThresholds {
    /// Threshold for ordinary (non-immediate) actions of `role`
    pub fn for_role(&self, role: Role) -> u64 {
        match role {
            Role::Owner => self.owner,
            Role::AssetsOp => self.assets_op,
            Role::Guardian => self.guardian,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in Role::ALL {
            if self.for_role(role) == 0 {
                return Err(ConfigError::ZeroThreshold { role });
            }
        }
        if self.guardian_immediate < self.guardian {
            return Err(ConfigError::ImmediateBelowTimelocked {
                immediate: self.guardian_immediate,
                timelocked: self.guardian,
            });
        }
        Ok(())
    }
}

/// Recovery timelock bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockConfig {
    /// Timelock a new wallet starts with
    #[serde(default = "default_timelock")]
    pub default_duration_secs: u64,
    /// Floor for every later timelock change
    #[serde(default = "default_min_timelock")]
    pub min_duration_secs: u64,
}

fn default_timelock() -> u64 {
    48 * 3600 // 48 hours
}

fn default_min_timelock() -> u64 {
    3600 // 1 hour
}

impl Default for TimelockConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_timelock(),
            min_duration_secs: default_min_timelock(),
        }
    }
}

/// Everything a wallet needs besides its state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Chain id bound into every action digest
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default)]
    pub thresholds: RoleThresholds,
    #[serde(default)]
    pub timelock: TimelockConfig,
    #[serde(default)]
    pub credentials: CredentialPolicy,
}

fn default_chain_id() -> u64 {
    1
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            thresholds: RoleThresholds::default(),
            timelock: TimelockConfig::default(),
            credentials: CredentialPolicy::default(),
        }
    }
}

impl WalletConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.timelock.default_duration_secs < self.timelock.min_duration_secs {
            return Err(ConfigError::DefaultTimelockBelowMinimum {
                default: self.timelock.default_duration_secs,
                minimum: self.timelock.min_duration_secs,
            });
        }
        Ok(())
    }

    /// Builder: override the role thresholds
    pub fn with_thresholds(mut self, thresholds: RoleThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Builder: override the chain id
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }
}
