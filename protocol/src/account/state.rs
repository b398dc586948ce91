//! Per-account balance state with lazy epoch roll-over.

use serde::{Deserialize, Serialize};

/// What a client knows about its own account, in plaintext.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Spendable this epoch.
    pub available: u64,
    /// Received this epoch; spendable from the next.
    pub pending: u64,
    /// Whether this epoch's spend has already happened.
    pub nonce_used: bool,
    /// Epoch at which `available` was last topped up from `pending`.
    pub last_roll_over: u64,
}

impl AccountState {
    /// A fresh, empty account first seen at `epoch`.
    pub fn new(epoch: u64) -> Self {
        Self {
            last_roll_over: epoch,
            ..Self::default()
        }
    }

    /// The state as it would read at `epoch`. Earlier or equal epochs return
    /// the state unchanged.
    pub fn simulate(&self, epoch: u64) -> Self {
        if self.last_roll_over >= epoch {
            return *self;
        }
        Self {
            available: self.available.saturating_add(self.pending),
            pending: 0,
            nonce_used: false,
            last_roll_over: epoch,
        }
    }

    /// Apply [`simulate`](Self::simulate) in place.
    pub fn roll_over(&mut self, epoch: u64) {
        *self = self.simulate(epoch);
    }

    pub fn balance(&self) -> u64 {
        self.available.saturating_add(self.pending)
    }
}
