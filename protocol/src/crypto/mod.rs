//! # Algebra Core
//!
//! The group, field and hashing layer every proof is built on: alt_bn128
//! via arkworks, Keccak-256 for every digest, and the ElGamal encryption
//! that holds account balances.
//!
//! Points, scalars and transcripts use one fixed 32-byte word encoding;
//! prover and verifier must agree on it byte for byte.

pub mod curve;
pub mod encryption;
pub mod hash;
pub mod keys;
pub mod vector;

pub use curve::{
    blinding_generator, epoch_generator, generator, hash_to_curve, point_from_bytes,
    point_from_hex, point_to_bytes, point_to_hex, random_scalar, scalar_from_bytes,
    scalar_to_bytes, EncodingError, Point, Scalar,
};
pub use encryption::{decrypt, DecryptError, ElGamal};
pub use hash::{keccak256, Transcript};
pub use keys::{verify_registration, Address, Keypair, RegistrationSignature};
