//! # Ledger Collaborator
//!
//! The ledger stores one encrypted balance and one encrypted pending table
//! per registered key, verifies submitted proofs and announces transfers.
//! Clients only ever talk to it through the [`Ledger`] trait;
//! [`InMemoryLedger`] is the reference implementation used by tests, benches
//! and the demo.
//!
//! ## Accounts
//!
//! ```text
//! acc[y]      spendable ciphertext, changes only at roll-over and rekey
//! pending[y]  ciphertext credited this epoch
//! last[y]     epoch of the last roll-over
//! ```
//!
//! On first touch in a later epoch `acc += pending; pending = 0`. Deposits,
//! transfer deltas, fees and withdrawals all land in `pending`, so a proof
//! built against `acc` stays valid for the whole epoch.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::crypto::curve::{EncodingError, Point};
use crate::crypto::encryption::ElGamal;
use crate::crypto::keys::{Address, RegistrationSignature};
use crate::zkp::VerificationError;

pub use memory::InMemoryLedger;

/// Deployment-wide parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParameters {
    /// Seconds per epoch.
    pub epoch_length: u64,
    /// Charged on every transfer and credited to the named beneficiary.
    pub fee: u64,
}

impl Default for LedgerParameters {
    fn default() -> Self {
        Self {
            epoch_length: 6,
            fee: 0,
        }
    }
}

/// Identifier of an accepted submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: TxId,
    /// Epoch the submission was accepted in.
    pub epoch: u64,
}

/// Re-keying of every party in a transfer by one shared `δ`.
///
/// `up_left[i] = g·δ + y[i]·r'` and `up_right = g·r'` encrypt `δ` to each
/// party. The adjustments move the stored ciphertexts to the new key:
/// `acc.L += acc.R·δ` and `pending.L += pending.R·δ`, where `pending.R`
/// already includes this transfer's `D`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyUpdate {
    pub up_left: Vec<Point>,
    pub up_right: Point,
    pub account_adjust: Vec<Point>,
    pub pending_adjust: Vec<Point>,
    /// `y[i] + g·δ`.
    pub new_keys: Vec<Point>,
}

impl KeyUpdate {
    pub fn rotation(&self) -> KeyRotation {
        KeyRotation {
            up_left: self.up_left.clone(),
            up_right: self.up_right,
        }
    }
}

/// The part of a [`KeyUpdate`] parties need to learn `δ`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRotation {
    pub up_left: Vec<Point>,
    pub up_right: Point,
}

#[derive(Clone, Debug)]
pub struct TransferTransaction {
    /// Left halves `C[i]` of the per-party deltas.
    pub deltas: Vec<Point>,
    /// Shared right half `D`.
    pub d: Point,
    /// Anonymity set.
    pub keys: Vec<Point>,
    pub nonce: Point,
    /// Account credited with the fee, if any.
    pub beneficiary: Option<Point>,
    /// Serialized [`TransferProof`](crate::zkp::TransferProof).
    pub proof: Vec<u8>,
    pub key_update: Option<KeyUpdate>,
}

#[derive(Clone, Debug)]
pub struct BurnTransaction {
    pub key: Point,
    pub value: u64,
    pub nonce: Point,
    /// Submitting address, bound by the proof.
    pub sender: Address,
    /// Serialized [`BurnProof`](crate::zkp::BurnProof).
    pub proof: Vec<u8>,
}

/// Announcement of an accepted transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferEvent {
    pub tx_id: TxId,
    pub epoch: u64,
    /// Anonymity set as it was before any rekey.
    pub parties: Vec<Point>,
    pub deltas: Vec<Point>,
    pub d: Point,
    pub key_update: Option<KeyRotation>,
    pub beneficiary: Option<Point>,
}

impl TransferEvent {
    /// Delta ciphertext for party `i`.
    pub fn delta(&self, i: usize) -> Option<ElGamal> {
        self.deltas.get(i).map(|c| ElGamal::new(*c, self.d))
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {key} is already registered")]
    AlreadyRegistered { key: String },

    #[error("account {key} is not registered")]
    NotRegistered { key: String },

    #[error("registration signature does not verify")]
    InvalidRegistration,

    #[error("nonce already used in epoch {epoch}")]
    NonceUsed { epoch: u64 },

    #[error("submitted in epoch {submitted}, but the ledger is now in epoch {current}")]
    EpochChanged { submitted: u64, current: u64 },

    #[error("account {key} changed while the proof was being verified")]
    AccountChanged { key: String },

    #[error("key {key} appears more than once")]
    DuplicateParty { key: String },

    #[error("value {value} exceeds the maximum balance {max}")]
    ValueTooLarge { value: u64, max: u64 },

    #[error("malformed transaction: {0}")]
    Malformed(String),

    #[error("proof rejected: {0}")]
    Verification(#[from] VerificationError),

    #[error("proof encoding: {0}")]
    Encoding(#[from] EncodingError),
}

/// What a client needs from the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address the ledger signs registrations against.
    fn address(&self) -> Address;

    fn parameters(&self) -> LedgerParameters;

    async fn register(
        &self,
        key: Point,
        signature: RegistrationSignature,
    ) -> Result<Receipt, LedgerError>;

    /// Credit `value` to the pending balance of `key`.
    async fn fund(&self, key: Point, value: u64) -> Result<Receipt, LedgerError>;

    /// Balances as they would read at `epoch`. Unregistered keys read as
    /// [`ElGamal::zero`].
    async fn simulate_accounts(&self, keys: &[Point], epoch: u64) -> Vec<ElGamal>;

    /// Pending tables as they would read at `epoch`.
    async fn pending_accounts(&self, keys: &[Point], epoch: u64) -> Vec<ElGamal>;

    async fn transfer(&self, transaction: TransferTransaction) -> Result<Receipt, LedgerError>;

    async fn burn(&self, transaction: BurnTransaction) -> Result<Receipt, LedgerError>;

    fn subscribe(&self) -> broadcast::Receiver<TransferEvent>;
}
