//! # Keccak Transcripts
//!
//! Every Fiat–Shamir challenge in the protocol is
//! `keccak256(abi.encode(values...)) mod q`, computed exactly the way the
//! on-chain verifier computes it. The [`Transcript`] builder reproduces the
//! Solidity ABI layout for the handful of types the protocol hashes:
//!
//! ```text
//! bytes32 / uint256 / address   one 32-byte word in the head
//! bytes32[2]   (a point)        two words in the head
//! bytes32[2][] (point array)    offset word in the head; len ‖ points in the tail
//! ```
//!
//! Order matters. A transcript that appends the same values in a different
//! order produces a different challenge, and the proof silently fails to
//! verify.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use sha3::{Digest, Keccak256};

use super::curve::{point_to_bytes, scalar_to_bytes, Point, Scalar};
use super::keys::Address;
use crate::config::{ADDRESS_LENGTH, SCALAR_LENGTH};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Keccak-256 reduced into the scalar field.
pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Fr::from_be_bytes_mod_order(&keccak256(data))
}

/// `uint256` word for an unsigned integer.
pub fn word(value: u64) -> [u8; SCALAR_LENGTH] {
    let mut out = [0u8; SCALAR_LENGTH];
    out[SCALAR_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
    out
}

enum Token {
    Static(Vec<u8>),
    Points(Vec<Point>),
}

/// ABI-encoding transcript builder.
///
/// ```
/// use zether_protocol::crypto::{generator, Transcript};
///
/// let g = generator();
/// let a = Transcript::new().point(&g).uint(7).challenge();
/// let b = Transcript::new().uint(7).point(&g).challenge();
/// assert_ne!(a, b);
/// ```
#[derive(Default)]
pub struct Transcript {
    tokens: Vec<Token>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scalar as `bytes32`.
    pub fn scalar(mut self, s: &Scalar) -> Self {
        self.tokens.push(Token::Static(scalar_to_bytes(s).to_vec()));
        self
    }

    /// Append an integer as `uint256`.
    pub fn uint(mut self, value: u64) -> Self {
        self.tokens.push(Token::Static(word(value).to_vec()));
        self
    }

    /// Append an address, left-padded to a word.
    pub fn address(mut self, address: &Address) -> Self {
        let mut padded = vec![0u8; SCALAR_LENGTH - ADDRESS_LENGTH];
        padded.extend_from_slice(address.as_bytes());
        self.tokens.push(Token::Static(padded));
        self
    }

    /// Append a point as `bytes32[2]`.
    pub fn point(mut self, p: &Point) -> Self {
        self.tokens.push(Token::Static(point_to_bytes(p).to_vec()));
        self
    }

    /// Append a point array as the dynamic type `bytes32[2][]`.
    pub fn points<'a, I>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point>,
    {
        self.tokens
            .push(Token::Points(points.into_iter().copied().collect()));
        self
    }

    /// The ABI encoding of everything appended so far.
    pub fn encode(&self) -> Vec<u8> {
        let head_len: usize = self
            .tokens
            .iter()
            .map(|t| match t {
                Token::Static(bytes) => bytes.len(),
                Token::Points(_) => SCALAR_LENGTH,
            })
            .sum();

        let mut head = Vec::with_capacity(head_len);
        let mut tail = Vec::new();
        for token in &self.tokens {
            match token {
                Token::Static(bytes) => head.extend_from_slice(bytes),
                Token::Points(points) => {
                    head.extend_from_slice(&word((head_len + tail.len()) as u64));
                    tail.extend_from_slice(&word(points.len() as u64));
                    for p in points {
                        tail.extend_from_slice(&point_to_bytes(p));
                    }
                }
            }
        }
        head.extend_from_slice(&tail);
        head
    }

    /// Hash the encoding to a challenge scalar.
    pub fn challenge(&self) -> Scalar {
        hash_to_scalar(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::generator;

    #[test]
    fn keccak_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn single_word_transcript_hashes_the_word() {
        let s = Fr::from(99u64);
        assert_eq!(
            Transcript::new().scalar(&s).challenge(),
            hash_to_scalar(&scalar_to_bytes(&s))
        );
    }

    #[test]
    fn dynamic_array_layout() {
        let g = generator();
        let encoded = Transcript::new()
            .points([g, g * Fr::from(2u64)].iter())
            .uint(5)
            .encode();
        // head: offset, uint; tail: len, two points
        assert_eq!(encoded.len(), 32 + 32 + 32 + 2 * 64);
        assert_eq!(&encoded[..32], &word(64));
        assert_eq!(&encoded[32..64], &word(5));
        assert_eq!(&encoded[64..96], &word(2));
        assert_eq!(&encoded[96..160], &point_to_bytes(&g));
    }

    #[test]
    fn address_is_left_padded() {
        let address = Address::from_bytes([0xab; ADDRESS_LENGTH]);
        let encoded = Transcript::new().address(&address).encode();
        assert_eq!(encoded.len(), 32);
        assert!(encoded[..12].iter().all(|b| *b == 0));
        assert!(encoded[12..].iter().all(|b| *b == 0xab));
    }
}
