//! # Account Module — Epochs, Spend Scheduling & Anonymity Sets
//!
//! Client-side bookkeeping that decides *when* a proof may be built and
//! *what set* it hides in. Nothing here touches the ledger; the client
//! feeds it clock readings and ledger parameters.
//!
//! ## Architecture
//!
//! ```text
//! state.rs      — available / pending / nonce per account, lazy roll-over
//! schedule.rs   — clocks, epoch arithmetic, proving-time estimate, deferrals
//! anonymity.rs  — power-of-two sets, unbiased shuffle, parity fix-up
//! ```
//!
//! ## Rules
//!
//! 1. **Funds received in epoch E are spendable from E+1.** Roll-over moves
//!    `pending` into `available` the first time the account is looked at
//!    in a later epoch.
//!
//! 2. **One spend per account per epoch.** The ledger enforces it with the
//!    nonce `gEpoch·sk`; the client mirrors it in `nonce_used` so it can
//!    wait instead of submitting a doomed proof.
//!
//! 3. **Waiting is not failing.** Pending funds, a used nonce or too little
//!    time left in the epoch defer an operation. A set too large to prove
//!    within one epoch is a configuration error and never waits.

pub mod anonymity;
pub mod schedule;
pub mod state;

use thiserror::Error;

pub use anonymity::AnonymitySet;
pub use schedule::{
    check_capacity, estimate_proving_millis, plan_spend, Clock, DeferReason, EpochSchedule,
    Schedule, SystemClock, TokioClock,
};
pub use state::AccountState;

/// Local validation and configuration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    /// The anonymity set size is not a power of two.
    #[error(
        "anonymity set size {size} (including sender and receiver) must be a power of two: \
         add {add} or remove {remove}"
    )]
    AnonymitySetSize {
        size: usize,
        add: usize,
        remove: usize,
    },

    /// Proving for this set size may outlast a whole epoch.
    #[error(
        "anonymity set size {size} may take longer than the epoch length ({epoch_length} seconds) \
         to prove; redeploy with an epoch length of at least {suggested} seconds"
    )]
    EpochTooShort {
        size: usize,
        epoch_length: u64,
        suggested: u64,
    },

    /// The amount (including any fee) exceeds available plus pending.
    #[error("requested {requested} exceeds account balance of {balance}")]
    InsufficientBalance { requested: u64, balance: u64 },
}
