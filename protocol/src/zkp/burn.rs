//! # Burn (Withdrawal) Proof
//!
//! A withdrawal is public in amount, so there is no range proof and no
//! anonymity set. The ledger subtracts `g·value` from the account's left
//! component and the prover shows three things about the result
//! `(CLn, CRn)`:
//!
//! ```text
//! y   = g·sk                      (owns the key)
//! CLn = g·bDiff + CRn·sk          (the residual balance is bDiff)
//! u   = gEpoch·sk                 (the nonce is this key's)
//! ```
//!
//! with one Fiat–Shamir challenge over `H(statementHash, A_y, A_b, A_u)`.
//! The statement hash binds the withdrawing address so the proof cannot be
//! replayed by someone else.

use ark_std::rand::Rng;

use super::encoding::{ProofReader, ProofWriter};
use crate::config::SCALAR_LENGTH;
use crate::crypto::curve::{
    epoch_generator, generator, random_scalar, EncodingError, Point, Scalar,
};
use crate::crypto::encryption::ElGamal;
use crate::crypto::hash::Transcript;
use crate::crypto::keys::Address;

/// Serialized burn proof length: `c ‖ s_sk ‖ s_b`.
pub const BURN_PROOF_LENGTH: usize = 3 * SCALAR_LENGTH;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnStatement {
    /// Account balance after the withdrawal.
    pub balance: ElGamal,
    pub key: Point,
    pub epoch: u64,
    pub nonce: Point,
    /// Address submitting the withdrawal.
    pub sender: Address,
}

impl BurnStatement {
    /// `H(CLn, CRn, y, epoch, sender)`.
    pub fn hash(&self) -> Scalar {
        Transcript::new()
            .point(&self.balance.left)
            .point(&self.balance.right)
            .point(&self.key)
            .uint(self.epoch)
            .address(&self.sender)
            .challenge()
    }
}

#[derive(Clone)]
pub struct BurnWitness {
    pub secret: Scalar,
    /// Balance left after the withdrawal.
    pub remaining: u64,
}

impl std::fmt::Debug for BurnWitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BurnWitness").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnProof {
    pub c: Scalar,
    pub s_sk: Scalar,
    pub s_b: Scalar,
}

impl BurnProof {
    pub fn prove<R: Rng + ?Sized>(
        statement: &BurnStatement,
        witness: &BurnWitness,
        rng: &mut R,
    ) -> Self {
        let g = generator();
        let k_sk = random_scalar(rng);
        let k_b = random_scalar(rng);
        let commitments = BurnCommitments {
            a_y: g * k_sk,
            a_b: g * k_b + statement.balance.right * k_sk,
            a_u: epoch_generator(statement.epoch) * k_sk,
        };
        let c = commitments.challenge(&statement.hash());
        Self {
            c,
            s_sk: k_sk + c * witness.secret,
            s_b: k_b + c * Scalar::from(witness.remaining),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ProofWriter::default()
            .scalar(&self.c)
            .scalar(&self.s_sk)
            .scalar(&self.s_b)
            .finish()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != BURN_PROOF_LENGTH {
            return Err(EncodingError::InvalidLength {
                expected: BURN_PROOF_LENGTH,
                actual: bytes.len(),
            });
        }
        let mut input = ProofReader::new(bytes);
        let proof = Self {
            c: input.scalar()?,
            s_sk: input.scalar()?,
            s_b: input.scalar()?,
        };
        input.finish()?;
        Ok(proof)
    }
}

pub(crate) struct BurnCommitments {
    pub a_y: Point,
    pub a_b: Point,
    pub a_u: Point,
}

impl BurnCommitments {
    pub(crate) fn challenge(&self, statement_hash: &Scalar) -> Scalar {
        Transcript::new()
            .scalar(statement_hash)
            .point(&self.a_y)
            .point(&self.a_b)
            .point(&self.a_u)
            .challenge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn encodes_to_three_words() {
        let mut rng = StdRng::seed_from_u64(42);
        let keypair = Keypair::generate(&mut rng);
        let (balance, _) = ElGamal::encrypt(&keypair.public(), Scalar::from(5u64), &mut rng);
        let statement = BurnStatement {
            balance,
            key: keypair.public(),
            epoch: 3,
            nonce: epoch_generator(3) * keypair.secret(),
            sender: Address::random(&mut rng),
        };
        let witness = BurnWitness {
            secret: keypair.secret(),
            remaining: 5,
        };
        let proof = BurnProof::prove(&statement, &witness, &mut rng);
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), BURN_PROOF_LENGTH);
        assert_eq!(BurnProof::from_bytes(&bytes).unwrap(), proof);
        assert!(BurnProof::from_bytes(&bytes[1..]).is_err());
    }
}
