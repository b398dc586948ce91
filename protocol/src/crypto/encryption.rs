//! # Additive ElGamal
//!
//! Balances are encrypted "in the exponent":
//!
//! ```text
//! Enc(pk, v; r) = (L, R) = (g·v + pk·r, g·r)
//! ```
//!
//! Componentwise addition of two ciphertexts under the same key adds the
//! plaintexts, scalar multiplication scales them, and [`ElGamal::plus`]
//! shifts the plaintext by a public constant without touching the
//! randomness. That module structure is what lets the ledger update
//! balances it cannot read.
//!
//! ## Decryption
//!
//! Decryption recovers `g·v = L − R·sk` and then has to find `v`. We do
//! it by **linear search** from zero up to the protocol-wide bound. The
//! worst case is `MAX_BALANCE` group additions; realistic balances are
//! small, so the search finishes early. A value with no match below the
//! bound is reported as [`DecryptError::OutOfBound`]; nothing panics.
//!
//! An all-identity ciphertext is what the ledger reports for an unknown
//! key, so [`ElGamal::is_zero`] doubles as the "not registered" check.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use ark_bn254::Fr;
use ark_ff::Zero;
use ark_std::rand::Rng;
use thiserror::Error;

use super::curve::{
    generator, point_from_bytes, point_to_bytes, random_scalar, EncodingError, Point, Scalar,
};
use crate::config::POINT_LENGTH;

/// Errors that can occur during decryption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("no plaintext below {bound} matches the ciphertext")]
    OutOfBound { bound: u64 },
}

/// An ElGamal ciphertext `(L, R)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElGamal {
    pub left: Point,
    pub right: Point,
}

impl ElGamal {
    pub fn new(left: Point, right: Point) -> Self {
        Self { left, right }
    }

    /// The all-identity ciphertext.
    pub fn zero() -> Self {
        Self::new(Point::zero(), Point::zero())
    }

    /// True iff both components are the identity.
    pub fn is_zero(&self) -> bool {
        self.left.is_zero() && self.right.is_zero()
    }

    /// Encrypt `value` under `key` with fresh randomness. Returns the
    /// ciphertext and the randomness used.
    pub fn encrypt<R: Rng + ?Sized>(key: &Point, value: Scalar, rng: &mut R) -> (Self, Scalar) {
        let randomness = random_scalar(rng);
        (Self::encrypt_with(key, value, randomness), randomness)
    }

    /// Encrypt with caller-chosen randomness.
    pub fn encrypt_with(key: &Point, value: Scalar, randomness: Scalar) -> Self {
        Self::new(
            generator() * value + *key * randomness,
            generator() * randomness,
        )
    }

    /// Shift the encrypted value by a public constant.
    pub fn plus(&self, value: Scalar) -> Self {
        Self::new(self.left + generator() * value, self.right)
    }

    /// Recover `g·v` given the secret key.
    pub fn message_point(&self, secret: &Scalar) -> Point {
        self.left - self.right * secret
    }

    pub fn to_bytes(&self) -> [u8; 2 * POINT_LENGTH] {
        let mut out = [0u8; 2 * POINT_LENGTH];
        out[..POINT_LENGTH].copy_from_slice(&point_to_bytes(&self.left));
        out[POINT_LENGTH..].copy_from_slice(&point_to_bytes(&self.right));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != 2 * POINT_LENGTH {
            return Err(EncodingError::InvalidLength {
                expected: 2 * POINT_LENGTH,
                actual: bytes.len(),
            });
        }
        Ok(Self::new(
            point_from_bytes(&bytes[..POINT_LENGTH])?,
            point_from_bytes(&bytes[POINT_LENGTH..])?,
        ))
    }
}

impl Add for ElGamal {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.left + other.left, self.right + other.right)
    }
}

impl AddAssign for ElGamal {
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl Sub for ElGamal {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl Neg for ElGamal {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.left, -self.right)
    }
}

impl Mul<Fr> for ElGamal {
    type Output = Self;

    fn mul(self, scalar: Fr) -> Self {
        Self::new(self.left * scalar, self.right * scalar)
    }
}

/// Decrypt by linear search over `[0, bound)`.
pub fn decrypt(ciphertext: &ElGamal, secret: &Scalar, bound: u64) -> Result<u64, DecryptError> {
    let target = ciphertext.message_point(secret);
    let g = generator();
    let mut accumulator = Point::zero();
    for value in 0..bound {
        if accumulator == target {
            return Ok(value);
        }
        accumulator += g;
    }
    Err(DecryptError::OutOfBound { bound })
}
