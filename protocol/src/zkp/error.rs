//! Error types for proof construction and verification.
//!
//! Construction errors ([`ProofError`]) are local validation failures: the
//! statement or witness has the wrong shape and no proof is produced.
//! Verification errors ([`VerificationError`]) name the first check a
//! proof failed.

use thiserror::Error;

use super::commitment::CommitmentError;
use crate::crypto::curve::EncodingError;

/// Errors that stop a proof from being built.
#[derive(Debug, Error)]
pub enum ProofError {
    /// The anonymity set is empty or not a power of two.
    #[error("anonymity set size {size} is not a power of two")]
    AnonymitySetSize { size: usize },

    /// A statement vector disagrees with the anonymity-set size.
    #[error("statement field {field} has {actual} entries, expected {expected}")]
    StatementShape {
        /// Name of the offending field.
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Sender or receiver index lies outside the anonymity set.
    #[error("index {index} out of range for anonymity set of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// The sender and receiver share a parity; the proof interleaves
    /// even and odd slots and needs one of each.
    #[error("sender index {sender} and receiver index {receiver} have the same parity")]
    SameParity { sender: usize, receiver: usize },

    /// A Fiat–Shamir challenge came out as zero and cannot be inverted.
    #[error("degenerate zero challenge")]
    DegenerateChallenge,

    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

/// Why a proof was rejected.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Statement and proof disagree on sizes, or a size is invalid.
    #[error("malformed statement or proof: {0}")]
    Malformed(String),

    /// The proof bytes did not decode.
    #[error("proof encoding: {0}")]
    Encoding(#[from] EncodingError),

    /// `A + B·w` does not open to the committed one-of-many vectors.
    #[error("anonymity-set opening check failed")]
    AnonymityOpening,

    /// The recomputed sigma challenge differs from the proof's.
    #[error("sigma-protocol challenge mismatch")]
    SigmaChallenge,

    /// The folded inner-product commitment does not match.
    #[error("inner-product argument check failed")]
    InnerProduct,

    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}
