//! # Zero-Knowledge Proof Module
//!
//! Everything needed to prove and check confidential transfers and
//! withdrawals over alt_bn128. There is no trusted setup: every generator
//! is a hash-to-curve output of a public seed.
//!
//! ## Architecture
//!
//! ```text
//! bases.rs          — generator vectors per length, scoped substitution
//! commitment.rs     — Pedersen scalar and vector commitments
//! inner_product.rs  — logarithmic inner-product argument
//! polynomial.rs     — one-of-many selector polynomials
//! transfer.rs       — anonymous transfer proof (range + one-of-many + sigma)
//! burn.rs           — withdrawal sigma proof
//! verifier.rs       — ledger-side checks for both proofs
//! encoding.rs       — fixed-order proof byte layout
//! ```
//!
//! ## Security Model
//!
//! - **Commitment hiding**: information-theoretic.
//! - **Commitment binding**: DLOG on G1; no two generators have a known
//!   relation.
//! - **Range**: 64 committed bits, two 32-bit limbs (amount, residual).
//! - **Anonymity**: the proof is zero-knowledge in which slot of the set is
//!   the sender and which is the receiver.
//!
//! Proving is synchronous and single-threaded. The [`BaseTable`] passed in
//! by the caller is the only mutable state touched, and it is restored
//! before the call returns.

pub mod bases;
pub mod burn;
pub mod commitment;
mod encoding;
pub mod error;
pub mod inner_product;
pub mod polynomial;
pub mod transfer;
pub mod verifier;

pub use bases::{BaseGuard, BaseTable, VectorBase};
pub use burn::{BurnProof, BurnStatement, BurnWitness, BURN_PROOF_LENGTH};
pub use commitment::{CommitmentError, PedersenCommitment, VectorCommitment};
pub use error::{ProofError, VerificationError};
pub use inner_product::InnerProductProof;
pub use transfer::{TransferProof, TransferStatement, TransferWitness};
pub use verifier::{verify_burn, verify_transfer};
