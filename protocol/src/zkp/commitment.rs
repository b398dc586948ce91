//! # Pedersen Commitments over alt_bn128
//!
//! ```text
//! scalar:  C = g·v + h·r
//! vector:  C = h·r + Σ gs_i·a_i + Σ hs_i·b_i
//! ```
//!
//! `g`, `h`, `gs`, `hs` are hash-to-curve outputs from public seeds, so
//! nobody knows a discrete-log relation between any two of them. Hiding is
//! information-theoretic; binding reduces to DLOG on G1.
//!
//! Vector commitments keep their openings (`a`, `b`, `r`) alongside the
//! point because the range proof reuses them to build `l(X)`, `r(X)` and
//! the final blinding `mu`.

use ark_bn254::Fr;
use ark_std::rand::Rng;
use thiserror::Error;

use super::bases::VectorBase;
use crate::crypto::curve::{blinding_generator, generator, random_scalar, Point, Scalar};
use crate::crypto::vector::multi_exp;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by vector commitments and generator bases.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("vector length {len} is not a power of two")]
    NotPowerOfTwo { len: usize },

    #[error("vector length {len} exceeds base length {base}")]
    BaseTooShort { len: usize, base: usize },
}

// ---------------------------------------------------------------------------
// Scalar commitment
// ---------------------------------------------------------------------------

/// `g·v + h·r`, with its opening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedersenCommitment {
    pub point: Point,
    value: Scalar,
    randomness: Scalar,
}

impl PedersenCommitment {
    pub fn commit<R: Rng + ?Sized>(value: Scalar, rng: &mut R) -> Self {
        Self::commit_with(value, random_scalar(rng))
    }

    pub fn commit_with(value: Scalar, randomness: Scalar) -> Self {
        Self {
            point: generator() * value + blinding_generator() * randomness,
            value,
            randomness,
        }
    }

    pub fn value(&self) -> Scalar {
        self.value
    }

    pub fn randomness(&self) -> Scalar {
        self.randomness
    }
}

// ---------------------------------------------------------------------------
// Vector commitment
// ---------------------------------------------------------------------------

/// `h·r + <a, gs> + <b, hs>`, with its opening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorCommitment {
    pub point: Point,
    g_values: Vec<Scalar>,
    h_values: Vec<Scalar>,
    randomness: Scalar,
}

impl VectorCommitment {
    /// Commit with fresh randomness.
    pub fn commit<R: Rng + ?Sized>(
        base: &VectorBase,
        g_values: Vec<Scalar>,
        h_values: Vec<Scalar>,
        rng: &mut R,
    ) -> Result<Self, CommitmentError> {
        Self::commit_with(base, g_values, h_values, random_scalar(rng))
    }

    /// Commit with caller-chosen randomness. Vectors must have equal
    /// power-of-two length no longer than the base; shorter vectors use the
    /// base's prefix.
    pub fn commit_with(
        base: &VectorBase,
        g_values: Vec<Scalar>,
        h_values: Vec<Scalar>,
        randomness: Fr,
    ) -> Result<Self, CommitmentError> {
        if g_values.len() != h_values.len() {
            return Err(CommitmentError::LengthMismatch {
                left: g_values.len(),
                right: h_values.len(),
            });
        }
        let len = g_values.len();
        if len == 0 || !len.is_power_of_two() {
            return Err(CommitmentError::NotPowerOfTwo { len });
        }
        if len > base.len() {
            return Err(CommitmentError::BaseTooShort {
                len,
                base: base.len(),
            });
        }
        let point = base.h() * randomness
            + multi_exp(&base.gs()[..len], &g_values)
            + multi_exp(&base.hs()[..len], &h_values);
        Ok(Self {
            point,
            g_values,
            h_values,
            randomness,
        })
    }

    pub fn g_values(&self) -> &[Scalar] {
        &self.g_values
    }

    pub fn h_values(&self) -> &[Scalar] {
        &self.h_values
    }

    pub fn randomness(&self) -> Scalar {
        self.randomness
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
