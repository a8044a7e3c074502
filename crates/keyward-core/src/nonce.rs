//! Dual replay counters
//!
//! Asset-moving and configuration actions are sequenced independently, so a
//! pending batch never blocks a recovery and vice versa. Each counter stores
//! the last consumed nonce; the next acceptable one is `stored + 1`.

use keyward_types::{NonceKind, SequencingError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceLedger {
    assets: u64,
    config: u64,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last consumed nonce of `kind` (0 when none)
    pub fn current(&self, kind: NonceKind) -> u64 {
        match kind {
            NonceKind::Assets => self.assets,
            NonceKind::Config => self.config,
        }
    }

    /// Next acceptable nonce of `kind`
    pub fn next(&self, kind: NonceKind) -> u64 {
        self.current(kind).saturating_add(1)
    }

    /// Classify `presented` without consuming it
    pub fn check(&self, kind: NonceKind, presented: u64) -> Result<(), SequencingError> {
        let stored = self.current(kind);
        let expected = self.next(kind);
        if presented <= stored {
            Err(SequencingError::StaleNonce {
                kind,
                expected,
                presented,
            })
        } else if presented > expected {
            Err(SequencingError::FutureNonce {
                kind,
                expected,
                presented,
            })
        } else {
            Ok(())
        }
    }

    /// Check and consume, returning the new stored value
    pub fn consume(&mut self, kind: NonceKind, presented: u64) -> Result<u64, SequencingError> {
        self.check(kind, presented)?;
        let slot = match kind {
            NonceKind::Assets => &mut self.assets,
            NonceKind::Config => &mut self.config,
        };
        *slot = presented;
        Ok(presented)
    }
}
