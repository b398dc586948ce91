//! # alt_bn128 Group Algebra
//!
//! Scalars live in `Fr` (order q, the group order); point coordinates live in
//! `Fq` (order p). The two moduli differ, so every crossing between them is an
//! explicit reduction in this module.
//!
//! ## Encoding
//!
//! ```text
//! scalar  = 32-byte big-endian word, canonical (< q)
//! point   = x ‖ y, two 32-byte big-endian words, canonical (< p)
//! infinity = 64 zero bytes
//! ```
//!
//! Text form is the same bytes, hex encoded with a `0x` prefix.
//!
//! ## Hash to curve
//!
//! [`hash_to_curve`] is try-and-increment: read the seed as `x mod p`, compute
//! `y = (x³ + 3)^((p+1)/4)`, accept if `y² = x³ + 3`, else bump `x` and retry.
//! It is not constant time, which is fine: it only ever sees public seeds.

use std::sync::OnceLock;

use ark_bn254::{Fq, Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, Field, One, PrimeField, UniformRand, Zero};
use ark_std::rand::Rng;
use thiserror::Error;

use super::hash::{keccak256, word};
use crate::config::{
    BLINDING_GENERATOR_SEED, EPOCH_GENERATOR_SEED, POINT_LENGTH, SCALAR_LENGTH,
    VALUE_GENERATOR_SEED,
};

/// Element of the scalar field (order q).
pub type Scalar = Fr;

/// Element of G1.
pub type Point = G1Projective;

/// Errors decoding scalars and points from bytes or hex.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("non-canonical encoding: value exceeds the field modulus")]
    NonCanonical,

    #[error("point is not on the curve")]
    NotOnCurve,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// The value generator `g`.
pub fn generator() -> Point {
    static G: OnceLock<Point> = OnceLock::new();
    *G.get_or_init(|| hash_to_curve(&keccak256(VALUE_GENERATOR_SEED)))
}

/// The blinding generator `h`.
pub fn blinding_generator() -> Point {
    static H: OnceLock<Point> = OnceLock::new();
    *H.get_or_init(|| hash_to_curve(&keccak256(BLINDING_GENERATOR_SEED)))
}

/// The nonce generator for `epoch`: `hashToCurve(keccak("Zether" ‖ uint256(epoch)))`.
pub fn epoch_generator(epoch: u64) -> Point {
    let mut seed = EPOCH_GENERATOR_SEED.to_vec();
    seed.extend_from_slice(&word(epoch));
    hash_to_curve(&keccak256(&seed))
}

/// Map a 32-byte seed to a curve point by try-and-increment.
pub fn hash_to_curve(seed: &[u8; 32]) -> Point {
    let exponent = sqrt_exponent();
    let b = Fq::from(3u64);
    let mut x = Fq::from_be_bytes_mod_order(seed);
    loop {
        let rhs = x.square() * x + b;
        let y = rhs.pow(exponent);
        if y.square() == rhs {
            return G1Affine::new_unchecked(x, y).into_group();
        }
        x += Fq::one();
    }
}

/// `(p + 1) / 4`. Valid square-root exponent because `p ≡ 3 (mod 4)`.
fn sqrt_exponent() -> <Fq as PrimeField>::BigInt {
    let mut exponent = Fq::MODULUS;
    exponent.add_with_carry(&<Fq as PrimeField>::BigInt::from(1u64));
    exponent.div2();
    exponent.div2();
    exponent
}

/// Uniform random scalar.
pub fn random_scalar<R: Rng + ?Sized>(rng: &mut R) -> Scalar {
    Fr::rand(rng)
}

// ---------------------------------------------------------------------------
// Scalar encoding
// ---------------------------------------------------------------------------

/// 32-byte big-endian encoding of a scalar.
pub fn scalar_to_bytes(s: &Scalar) -> [u8; SCALAR_LENGTH] {
    to_word(&s.into_bigint().to_bytes_be())
}

/// Decode a canonical 32-byte big-endian scalar.
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar, EncodingError> {
    canonical::<Fr>(bytes)
}

// ---------------------------------------------------------------------------
// Point encoding
// ---------------------------------------------------------------------------

/// Two big-endian coordinate words, or the all-zero sentinel for infinity.
pub fn point_to_bytes(p: &Point) -> [u8; POINT_LENGTH] {
    let mut out = [0u8; POINT_LENGTH];
    let affine = p.into_affine();
    if let Some((x, y)) = affine.xy() {
        out[..SCALAR_LENGTH].copy_from_slice(&to_word(&x.into_bigint().to_bytes_be()));
        out[SCALAR_LENGTH..].copy_from_slice(&to_word(&y.into_bigint().to_bytes_be()));
    }
    out
}

/// Decode a point, rejecting non-canonical coordinates and off-curve pairs.
pub fn point_from_bytes(bytes: &[u8]) -> Result<Point, EncodingError> {
    if bytes.len() != POINT_LENGTH {
        return Err(EncodingError::InvalidLength {
            expected: POINT_LENGTH,
            actual: bytes.len(),
        });
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(Point::zero());
    }
    let x = canonical::<Fq>(&bytes[..SCALAR_LENGTH])?;
    let y = canonical::<Fq>(&bytes[SCALAR_LENGTH..])?;
    let affine = G1Affine::new_unchecked(x, y);
    // alt_bn128 G1 has cofactor 1, so on-curve implies in-subgroup.
    if !affine.is_on_curve() {
        return Err(EncodingError::NotOnCurve);
    }
    Ok(affine.into_group())
}

/// `0x`-prefixed hex form of a point.
pub fn point_to_hex(p: &Point) -> String {
    format!("0x{}", hex::encode(point_to_bytes(p)))
}

/// Parse the `0x`-prefixed (or bare) hex form of a point.
pub fn point_from_hex(s: &str) -> Result<Point, EncodingError> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    point_from_bytes(&bytes)
}

fn to_word(be: &[u8]) -> [u8; SCALAR_LENGTH] {
    let mut out = [0u8; SCALAR_LENGTH];
    out[SCALAR_LENGTH - be.len()..].copy_from_slice(be);
    out
}

fn canonical<F: PrimeField>(bytes: &[u8]) -> Result<F, EncodingError> {
    if bytes.len() != SCALAR_LENGTH {
        return Err(EncodingError::InvalidLength {
            expected: SCALAR_LENGTH,
            actual: bytes.len(),
        });
    }
    let value = F::from_be_bytes_mod_order(bytes);
    if to_word(&value.into_bigint().to_bytes_be()) != bytes {
        return Err(EncodingError::NonCanonical);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn generator_matches_known_answer() {
        assert_eq!(
            point_to_hex(&generator()),
            "0x077da99d806abd13c9f15ece5398525119d11e11e9836b2ee7d23f6159ad87d4\
             01485efa927f2ad41bff567eec88f32fb0a0f706588b4e41a8d587d008b7f875"
        );
        assert_eq!(
            point_to_hex(&blinding_generator()),
            "0x01b7de3dcf359928dd19f643d54dc487478b68a5b2634f9f1903c9fb78331aef\
             2bda7d3ae6a557c716477c108be0d0f94abc6c4dc6b1bd93caccbcceaaa71d6b"
        );
    }

    #[test]
    fn epoch_generators_differ_per_epoch() {
        assert_ne!(epoch_generator(1), epoch_generator(2));
        assert_eq!(epoch_generator(7), epoch_generator(7));
    }

    #[test]
    fn point_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..8 {
            let p = generator() * random_scalar(&mut rng);
            assert_eq!(point_from_bytes(&point_to_bytes(&p)).unwrap(), p);
            assert_eq!(point_from_hex(&point_to_hex(&p)).unwrap(), p);
        }
    }

    #[test]
    fn identity_uses_zero_sentinel() {
        let bytes = point_to_bytes(&Point::zero());
        assert_eq!(bytes, [0u8; POINT_LENGTH]);
        assert!(point_from_bytes(&bytes).unwrap().is_zero());
    }

    #[test]
    fn scalar_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        let s = random_scalar(&mut rng);
        assert_eq!(scalar_from_bytes(&scalar_to_bytes(&s)).unwrap(), s);
    }

    #[test]
    fn rejects_off_curve_point() {
        let mut bytes = point_to_bytes(&generator());
        bytes[POINT_LENGTH - 1] ^= 1;
        assert!(matches!(
            point_from_bytes(&bytes),
            Err(EncodingError::NotOnCurve)
        ));
    }

    #[test]
    fn rejects_non_canonical_scalar() {
        assert!(matches!(
            scalar_from_bytes(&[0xff; SCALAR_LENGTH]),
            Err(EncodingError::NonCanonical)
        ));
        assert!(matches!(
            scalar_from_bytes(&[0u8; 31]),
            Err(EncodingError::InvalidLength { .. })
        ));
    }
}
