//! # Inner-Product Argument
//!
//! Proves knowledge of `a, b ∈ Fr^n` opening
//!
//! ```text
//! P = <a, gs> + <b, hs> + u·<a, b>
//! ```
//!
//! with `log2(n)` pairs of points and two scalars. `u` is the base's `h`;
//! the range proof substitutes `h·o` for it before calling in.
//!
//! Each round splits everything in half, commits to the cross terms
//!
//! ```text
//! L = <aL, gR> + <bR, hL> + u·<aL, bR>
//! R = <aR, gL> + <bL, hR> + u·<aR, bL>
//! ```
//!
//! derives `x = H(x_prev, L, R)` (the first round is seeded with a caller
//! salt), and folds
//!
//! ```text
//! gs' = gL·x⁻¹ + gR·x      a' = aL·x + aR·x⁻¹
//! hs' = hL·x + hR·x⁻¹      b' = bL·x⁻¹ + bR·x
//! ```
//!
//! The prover installs each folded base in the caller's [`BaseTable`] for
//! the duration of the next round and restores it on the way out. The
//! verifier never folds points: it expands the challenges into one scalar
//! per generator and does a single multi-exponentiation.

use ark_bn254::Fr;
use ark_ff::{Field, One};

use super::bases::{BaseTable, VectorBase};
use super::commitment::CommitmentError;
use super::encoding::{ProofReader, ProofWriter};
use super::error::{ProofError, VerificationError};
use crate::crypto::curve::{EncodingError, Point, Scalar};
use crate::crypto::hash::Transcript;
use crate::crypto::vector::{inner_product, inverses, multi_exp};

/// Logarithmic opening of a vector commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerProductProof {
    pub ls: Vec<Point>,
    pub rs: Vec<Point>,
    pub a: Scalar,
    pub b: Scalar,
}

impl InnerProductProof {
    /// Prove `<a, b>` against `bases.base(a.len())`. `salt` seeds the first
    /// round challenge.
    pub fn prove(
        bases: &mut BaseTable,
        a: Vec<Scalar>,
        b: Vec<Scalar>,
        salt: Scalar,
    ) -> Result<Self, ProofError> {
        if a.len() != b.len() {
            return Err(CommitmentError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            }
            .into());
        }
        // Validates the length before any recursion.
        bases.base(a.len())?;

        let mut ls = Vec::new();
        let mut rs = Vec::new();
        let (a, b) = prove_round(bases, a, b, salt, &mut ls, &mut rs)?;
        Ok(Self { ls, rs, a, b })
    }

    /// Round challenges `x_j`, seeded with `salt`.
    pub fn challenges(&self, salt: Scalar) -> Vec<Scalar> {
        let mut previous = salt;
        self.ls
            .iter()
            .zip(&self.rs)
            .map(|(l, r)| {
                previous = round_challenge(&previous, l, r);
                previous
            })
            .collect()
    }

    /// `P + Σ (x_j²·L_j + x_j⁻²·R_j)`.
    pub fn fold_commitment(&self, commitment: Point, challenges: &[Scalar]) -> Point {
        let mut folded = commitment;
        for ((l, r), x) in self.ls.iter().zip(&self.rs).zip(challenges) {
            let x2 = x.square();
            folded += *l * x2 + *r * x2.inverse().unwrap_or_default();
        }
        folded
    }

    /// Check the proof opens `commitment` under `base`.
    pub fn verify(
        &self,
        base: &VectorBase,
        commitment: Point,
        salt: Scalar,
    ) -> Result<(), VerificationError> {
        let n = base.len();
        let rounds = n.trailing_zeros() as usize;
        if self.ls.len() != rounds || self.rs.len() != rounds {
            return Err(VerificationError::Malformed(format!(
                "inner-product proof has {} rounds, base of length {n} needs {rounds}",
                self.ls.len()
            )));
        }

        let challenges = self.challenges(salt);
        let challenge_inverses = inverses(&challenges);
        let folded = self.fold_commitment(commitment, &challenges);

        // s_i = Π_j x_j^{±1}: bit (rounds-1-j) of i picks x_j, otherwise x_j⁻¹.
        let mut s = vec![Fr::one(); n];
        for (i, s_i) in s.iter_mut().enumerate() {
            for j in 0..rounds {
                if (i >> (rounds - 1 - j)) & 1 == 1 {
                    *s_i *= challenges[j];
                } else {
                    *s_i *= challenge_inverses[j];
                }
            }
        }
        let s_inv = inverses(&s);

        let g_scalars: Vec<Fr> = s.iter().map(|x| *x * self.a).collect();
        let h_scalars: Vec<Fr> = s_inv.iter().map(|x| *x * self.b).collect();
        let expected = multi_exp(base.gs(), &g_scalars)
            + multi_exp(base.hs(), &h_scalars)
            + base.h() * (self.a * self.b);

        if folded != expected {
            return Err(VerificationError::InnerProduct);
        }
        Ok(())
    }

    pub(crate) fn write(&self, out: &mut ProofWriter) {
        out.points(&self.ls)
            .points(&self.rs)
            .scalar(&self.a)
            .scalar(&self.b);
    }

    pub(crate) fn read(input: &mut ProofReader<'_>, rounds: usize) -> Result<Self, EncodingError> {
        Ok(Self {
            ls: input.points(rounds)?,
            rs: input.points(rounds)?,
            a: input.scalar()?,
            b: input.scalar()?,
        })
    }
}

fn round_challenge(previous: &Scalar, l: &Point, r: &Point) -> Scalar {
    Transcript::new().scalar(previous).point(l).point(r).challenge()
}

/// One halving round. `ls`/`rs` accumulate the cross-term commitments; the
/// folded base for the next round lives in `bases` until this returns.
fn prove_round(
    bases: &mut BaseTable,
    a: Vec<Scalar>,
    b: Vec<Scalar>,
    previous: Scalar,
    ls: &mut Vec<Point>,
    rs: &mut Vec<Point>,
) -> Result<(Scalar, Scalar), ProofError> {
    let n = a.len();
    if n == 1 {
        return Ok((a[0], b[0]));
    }

    let base = bases.base(n)?.clone();
    let mid = n / 2;
    let (a_l, a_r) = a.split_at(mid);
    let (b_l, b_r) = b.split_at(mid);
    let (g_l, g_r) = base.gs().split_at(mid);
    let (h_l, h_r) = base.hs().split_at(mid);

    let l = multi_exp(g_r, a_l) + multi_exp(h_l, b_r) + base.h() * inner_product(a_l, b_r);
    let r = multi_exp(g_l, a_r) + multi_exp(h_r, b_l) + base.h() * inner_product(a_r, b_l);
    let x = round_challenge(&previous, &l, &r);
    let x_inv = x.inverse().ok_or(ProofError::DegenerateChallenge)?;
    ls.push(l);
    rs.push(r);

    let a_next = (0..mid).map(|i| a_l[i] * x + a_r[i] * x_inv).collect();
    let b_next = (0..mid).map(|i| b_l[i] * x_inv + b_r[i] * x).collect();

    let mut guard = bases.substitute(mid, base.fold(x, x_inv))?;
    prove_round(&mut guard, a_next, b_next, x, ls, rs)
}
