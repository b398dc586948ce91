//! # Account Keys
//!
//! An account is a scalar secret `sk` and its public point `pk = g·sk`.
//! The pair only ever changes together: a key-rotation delta `δ` moves the
//! secret to `sk + δ` and the public key to `pk + g·δ` in one step.
//!
//! Registration proves knowledge of `sk` with a Schnorr signature bound to
//! the ledger's address, so a registration cannot be replayed against a
//! different ledger:
//!
//! ```text
//! K = g·k,  c = H(address, pk, K),  s = c·sk + k
//! verify:   K' = g·s − pk·c,  c == H(address, pk, K')
//! ```
//!
//! Secrets are never logged and `Keypair`'s `Debug` impl prints only the
//! public half.

use std::fmt;

use ark_bn254::Fr;
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};

use super::curve::{generator, point_to_hex, random_scalar, Point, Scalar};
use super::hash::Transcript;
use crate::config::ADDRESS_LENGTH;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte ledger address (a ledger instance, or the account submitting a
/// withdrawal).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Random address, for test ledgers and throwaway submitters.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        rng.fill(&mut bytes[..]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// Schnorr proof of key ownership submitted with a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationSignature {
    pub c: Scalar,
    pub s: Scalar,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    secret: Scalar,
    public: Point,
}

impl Keypair {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_secret(random_scalar(rng))
    }

    /// Rebuild a keypair from a known secret (account recovery).
    pub fn from_secret(secret: Scalar) -> Self {
        Self {
            secret,
            public: generator() * secret,
        }
    }

    pub fn secret(&self) -> Scalar {
        self.secret
    }

    pub fn public(&self) -> Point {
        self.public
    }

    /// Apply a key-rotation delta to both halves of the pair.
    pub fn rotate(&mut self, delta: u64) {
        let delta = Fr::from(delta);
        self.secret += delta;
        self.public += generator() * delta;
    }

    /// Sign a registration for the ledger at `ledger`.
    pub fn sign_registration<R: Rng + ?Sized>(
        &self,
        ledger: &Address,
        rng: &mut R,
    ) -> RegistrationSignature {
        let k = random_scalar(rng);
        let commitment = generator() * k;
        let c = registration_challenge(ledger, &self.public, &commitment);
        RegistrationSignature {
            c,
            s: c * self.secret + k,
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &point_to_hex(&self.public))
            .finish_non_exhaustive()
    }
}

/// Check a registration signature for `public` against the ledger address.
pub fn verify_registration(
    ledger: &Address,
    public: &Point,
    signature: &RegistrationSignature,
) -> bool {
    let commitment = generator() * signature.s - *public * signature.c;
    registration_challenge(ledger, public, &commitment) == signature.c
}

fn registration_challenge(ledger: &Address, public: &Point, commitment: &Point) -> Scalar {
    Transcript::new()
        .address(ledger)
        .point(public)
        .point(commitment)
        .challenge()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn registration_signature_verifies() {
        let mut rng = StdRng::seed_from_u64(42);
        let keypair = Keypair::generate(&mut rng);
        let ledger = Address::random(&mut rng);
        let sig = keypair.sign_registration(&ledger, &mut rng);
        assert!(verify_registration(&ledger, &keypair.public(), &sig));
    }

    #[test]
    fn registration_is_bound_to_ledger_and_key() {
        let mut rng = StdRng::seed_from_u64(42);
        let keypair = Keypair::generate(&mut rng);
        let other = Keypair::generate(&mut rng);
        let ledger = Address::random(&mut rng);
        let sig = keypair.sign_registration(&ledger, &mut rng);

        assert!(!verify_registration(&Address::random(&mut rng), &keypair.public(), &sig));
        assert!(!verify_registration(&ledger, &other.public(), &sig));
    }

    #[test]
    fn rotation_keeps_pair_consistent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut keypair = Keypair::generate(&mut rng);
        keypair.rotate(17);
        assert_eq!(keypair.public(), generator() * keypair.secret());
    }

    #[test]
    fn debug_hides_secret() {
        let keypair = Keypair::from_secret(Fr::from(5u64));
        let rendered = format!("{keypair:?}");
        assert!(rendered.contains("public"));
        assert!(!rendered.contains("secret"));
    }
}
