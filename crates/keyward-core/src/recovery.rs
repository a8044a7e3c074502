//! Recovery state machine
//!
//! ```text
//!   Unlocked --propose (guardians)--> Locked { pending, unlock_at }
//!   Locked   --settle (now >= unlock_at)--> Unlocked, keyset <- pending
//!   Locked   --cancel (owners)--> Unlocked, keyset unchanged
//! ```
//!
//! Time never advances on its own: callers pass `now` and maturity is
//! evaluated lazily by [`RecoveryStateMachine::settle`]. Every `check_*`
//! method is side-effect free so a submission can be fully validated before
//! anything is written.

use keyward_types::{StateError, H256};
use serde::{Deserialize, Serialize};

/// Pending-rotation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked {
        pending_keyset_hash: H256,
        unlock_at: u64,
    },
}

/// Flattened view of [`LockState`] for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub is_locked: bool,
    pub pending_keyset_hash: Option<H256>,
    pub unlock_timestamp: Option<u64>,
}

impl From<LockState> for LockInfo {
    fn from(state: LockState) -> Self {
        match state {
            LockState::Unlocked => Self {
                is_locked: false,
                pending_keyset_hash: None,
                unlock_timestamp: None,
            },
            LockState::Locked {
                pending_keyset_hash,
                unlock_at,
            } => Self {
                is_locked: true,
                pending_keyset_hash: Some(pending_keyset_hash),
                unlock_timestamp: Some(unlock_at),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStateMachine {
    state: LockState,
    timelock_duration: u64,
    min_timelock: u64,
}

impl RecoveryStateMachine {
    pub fn new(timelock_duration: u64, min_timelock: u64) -> Self {
        Self {
            state: LockState::Unlocked,
            timelock_duration,
            min_timelock,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn lock_info(&self) -> LockInfo {
        self.state.into()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    pub fn timelock_duration(&self) -> u64 {
        self.timelock_duration
    }

    pub fn min_timelock(&self) -> u64 {
        self.min_timelock
    }

    /// Reject asset-moving actions while a rotation is pending
    pub fn check_unlocked(&self) -> Result<(), StateError> {
        match self.state {
            LockState::Unlocked => Ok(()),
            LockState::Locked {
                pending_keyset_hash,
                unlock_at,
            } => Err(StateError::Locked {
                pending_keyset_hash,
                unlock_at,
            }),
        }
    }

    pub fn check_propose(&self) -> Result<(), StateError> {
        if self.is_locked() {
            return Err(StateError::AlreadyLocked);
        }
        Ok(())
    }

    pub fn check_cancel(&self) -> Result<(), StateError> {
        if !self.is_locked() {
            return Err(StateError::NotLocked);
        }
        Ok(())
    }

    pub fn check_timelock(&self, duration: u64) -> Result<(), StateError> {
        if duration < self.min_timelock {
            return Err(StateError::TimelockBelowMinimum {
                requested: duration,
                minimum: self.min_timelock,
            });
        }
        Ok(())
    }

    /// Lock with `pending` as the future keyset. Returns the unlock time.
    pub fn propose(&mut self, pending: H256, immediate: bool, now: u64) -> Result<u64, StateError> {
        self.check_propose()?;
        let unlock_at = if immediate {
            now
        } else {
            now.saturating_add(self.timelock_duration)
        };
        self.state = LockState::Locked {
            pending_keyset_hash: pending,
            unlock_at,
        };
        Ok(unlock_at)
    }

    /// Drop the pending rotation. Returns the abandoned keyset hash.
    pub fn cancel(&mut self) -> Result<H256, StateError> {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Locked {
                pending_keyset_hash,
                ..
            } => Ok(pending_keyset_hash),
            LockState::Unlocked => Err(StateError::NotLocked),
        }
    }

    /// Unlock if the pending rotation has matured, yielding the new keyset hash
    pub fn settle(&mut self, now: u64) -> Option<H256> {
        match self.state {
            LockState::Locked {
                pending_keyset_hash,
                unlock_at,
            } if now >= unlock_at => {
                self.state = LockState::Unlocked;
                Some(pending_keyset_hash)
            }
            _ => None,
        }
    }

    /// Unconditionally unlock (the keyset is being replaced by owners)
    pub fn clear(&mut self) -> Option<H256> {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Locked {
                pending_keyset_hash,
                ..
            } => Some(pending_keyset_hash),
            LockState::Unlocked => None,
        }
    }

    /// Set the timelock, returning the previous one
    pub fn set_timelock_duration(&mut self, duration: u64) -> Result<u64, StateError> {
        self.check_timelock(duration)?;
        Ok(std::mem::replace(&mut self.timelock_duration, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn test_timelocked_proposal_matures() {
        let mut recovery = RecoveryStateMachine::new(DAY, 3600);
        let pending = H256([7; 32]);
        assert_eq!(recovery.propose(pending, false, 100).unwrap(), 100 + DAY);

        let info = recovery.lock_info();
        assert!(info.is_locked);
        assert_eq!(info.pending_keyset_hash, Some(pending));
        assert_eq!(info.unlock_timestamp, Some(100 + DAY));

        assert_eq!(recovery.settle(100 + DAY - 1), None);
        assert!(recovery.is_locked());
        assert_eq!(recovery.settle(100 + DAY), Some(pending));
        assert!(!recovery.is_locked());
    }

    #[test]
    fn test_immediate_proposal_settles_at_same_instant() {
        let mut recovery = RecoveryStateMachine::new(DAY, 3600);
        assert_eq!(recovery.propose(H256([1; 32]), true, 500).unwrap(), 500);
        assert_eq!(recovery.settle(500), Some(H256([1; 32])));
    }

    #[test]
    fn test_double_proposal_and_empty_cancel() {
        let mut recovery = RecoveryStateMachine::new(DAY, 3600);
        assert_eq!(recovery.cancel(), Err(StateError::NotLocked));

        recovery.propose(H256([1; 32]), false, 0).unwrap();
        assert_eq!(
            recovery.propose(H256([2; 32]), false, 0),
            Err(StateError::AlreadyLocked)
        );
        assert!(matches!(
            recovery.check_unlocked(),
            Err(StateError::Locked { unlock_at: DAY, .. })
        ));

        assert_eq!(recovery.cancel(), Ok(H256([1; 32])));
        assert!(recovery.check_unlocked().is_ok());
    }

    #[test]
    fn test_timelock_floor() {
        let mut recovery = RecoveryStateMachine::new(DAY, 3600);
        assert_eq!(
            recovery.set_timelock_duration(3599),
            Err(StateError::TimelockBelowMinimum {
                requested: 3599,
                minimum: 3600
            })
        );
        assert_eq!(recovery.set_timelock_duration(3600), Ok(DAY));
        assert_eq!(recovery.timelock_duration(), 3600);
    }
}
