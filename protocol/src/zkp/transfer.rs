//! # Anonymous Transfer Proof
//!
//! One proof shows, for an anonymity set of `N = 2^m` public keys, that
//!
//! 1. some slot `l0` holds the sender, who knows its secret key and whose
//!    post-transfer balance `bDiff` is in `[0, 2^32)`;
//! 2. some slot `l1` of the opposite parity is the receiver;
//! 3. the ciphertext deltas move exactly `bTransfer ∈ [0, 2^32)` from `l0`
//!    to `l1`, minus the public fee, and zero to everyone else;
//! 4. the nonce `u = gEpoch·sk` belongs to the sender.
//!
//! ## Proof pipeline
//!
//! ```text
//!  statementHash
//!       │
//!  BA, BS (range bits)   A, B (index bits)      ──► v
//!  CnG, C0G, y0G, CXG (selector aggregates)     ──► w ──► y, z
//!  T1, T2                                       ──► x
//!  Ay, AD, Ab, AX, At, Au (sigma commitments)   ──► c ──► o
//!  inner-product argument over l(x), r(x) with u = h·o
//! ```
//!
//! Each arrow is a Keccak challenge over the Solidity ABI encoding of the
//! previous challenge and the listed points; see [`Transcript`].
//!
//! The range proof covers one 64-bit number, `bTransfer + bDiff·2^32`.
//! Amounts wider than 32 bits are not rejected here: they produce a proof
//! that fails verification.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::{Field, One};
use ark_std::rand::Rng;
use tracing::debug;

use super::bases::BaseTable;
use super::commitment::{PedersenCommitment, VectorCommitment};
use super::encoding::{ProofReader, ProofWriter};
use super::error::ProofError;
use super::inner_product::InnerProductProof;
use super::polynomial::{
    coefficient_column, correlate, evaluate, index_bits, interleaved_sum, selector_polynomials,
    slot_weights,
};
use crate::config::{
    INNER_PRODUCT_ROUNDS, LIMB_BITS, POINT_LENGTH, RANGE_BITS, SCALAR_LENGTH,
};
use crate::crypto::curve::{
    blinding_generator, epoch_generator, generator, random_scalar, EncodingError, Point, Scalar,
};
use crate::crypto::encryption::ElGamal;
use crate::crypto::hash::Transcript;
use crate::crypto::vector::{inner_product, multi_exp, powers, weighted_sum};

/// Serialized length of everything except the per-bit parts.
const FIXED_LENGTH: usize =
    6 * POINT_LENGTH + 10 * SCALAR_LENGTH + 2 * INNER_PRODUCT_ROUNDS * POINT_LENGTH;

/// Serialized length added by each bit of the anonymity-set index: four
/// ciphertexts and two entries of `f`.
const PER_BIT_LENGTH: usize = 8 * POINT_LENGTH + 2 * SCALAR_LENGTH;

// ---------------------------------------------------------------------------
// Statement and witness
// ---------------------------------------------------------------------------

/// Public inputs of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferStatement {
    /// Post-transfer balances `Cn[i] = (CLn[i], CRn[i])`.
    pub balances: Vec<ElGamal>,
    /// Left halves of the transfer deltas `C[i]`. All deltas share `D`.
    pub deltas: Vec<Point>,
    /// Shared right half `D = g·r`.
    pub d: Point,
    /// Anonymity-set public keys `y[i]`.
    pub keys: Vec<Point>,
    pub epoch: u64,
    /// Sender nonce `u = gEpoch·sk`.
    pub nonce: Point,
    /// Public fee paid by the sender.
    pub fee: u64,
}

impl TransferStatement {
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Check vector lengths and return `m = log2(N)`.
    pub fn index_bits(&self) -> Result<usize, ProofError> {
        let size = self.size();
        if size < 2 || !size.is_power_of_two() {
            return Err(ProofError::AnonymitySetSize { size });
        }
        for (field, actual) in [
            ("balances", self.balances.len()),
            ("deltas", self.deltas.len()),
        ] {
            if actual != size {
                return Err(ProofError::StatementShape {
                    field,
                    expected: size,
                    actual,
                });
            }
        }
        Ok(size.trailing_zeros() as usize)
    }

    /// `H(CLn[], CRn[], C[], D, y[], epoch)`.
    pub fn hash(&self) -> Scalar {
        Transcript::new()
            .points(self.balances.iter().map(|c| &c.left))
            .points(self.balances.iter().map(|c| &c.right))
            .points(&self.deltas)
            .point(&self.d)
            .points(&self.keys)
            .uint(self.epoch)
            .challenge()
    }
}

/// Secret inputs of a transfer.
#[derive(Clone)]
pub struct TransferWitness {
    pub secret: Scalar,
    /// The `r` in `D = g·r`.
    pub randomness: Scalar,
    pub amount: u64,
    /// Sender balance after amount and fee.
    pub remaining: u64,
    pub sender_index: usize,
    pub receiver_index: usize,
}

impl fmt::Debug for TransferWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferWitness")
            .field("sender_index", &self.sender_index)
            .field("receiver_index", &self.receiver_index)
            .finish_non_exhaustive()
    }
}

impl TransferWitness {
    fn check(&self, size: usize) -> Result<(), ProofError> {
        for index in [self.sender_index, self.receiver_index] {
            if index >= size {
                return Err(ProofError::IndexOutOfRange { index, size });
            }
        }
        if self.sender_index % 2 == self.receiver_index % 2 {
            return Err(ProofError::SameParity {
                sender: self.sender_index,
                receiver: self.receiver_index,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Proof
// ---------------------------------------------------------------------------

/// A complete transfer proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferProof {
    pub ba: Point,
    pub bs: Point,
    pub a: Point,
    pub b: Point,
    pub cn_g: Vec<ElGamal>,
    pub c0_g: Vec<ElGamal>,
    pub y0_g: Vec<ElGamal>,
    pub cx_g: Vec<ElGamal>,
    pub f: Vec<Scalar>,
    pub z_a: Scalar,
    pub t1: Point,
    pub t2: Point,
    pub t_hat: Scalar,
    pub mu: Scalar,
    pub c: Scalar,
    pub s_sk: Scalar,
    pub s_r: Scalar,
    pub s_b: Scalar,
    pub s_tau: Scalar,
    pub inner: InnerProductProof,
}

impl TransferProof {
    /// Build a proof. `bases` provides the generator vectors and is left as
    /// it was found.
    pub fn prove<R: Rng + ?Sized>(
        bases: &mut BaseTable,
        statement: &TransferStatement,
        witness: &TransferWitness,
        rng: &mut R,
    ) -> Result<Self, ProofError> {
        let m = statement.index_bits()?;
        let n = statement.size();
        witness.check(n)?;
        let sender = witness.sender_index;
        let receiver = witness.receiver_index;
        let g = generator();

        // Range commitments over bTransfer ‖ bDiff.
        let number = u128::from(witness.amount) + (u128::from(witness.remaining) << LIMB_BITS);
        let a_l: Vec<Scalar> = (0..RANGE_BITS)
            .map(|i| Fr::from(((number >> i) & 1) as u64))
            .collect();
        let a_r: Vec<Scalar> = a_l.iter().map(|bit| *bit - Fr::one()).collect();
        let range_base = bases.base(RANGE_BITS)?.clone();
        let ba = VectorCommitment::commit(&range_base, a_l, a_r, rng)?;
        let bs = VectorCommitment::commit(
            &range_base,
            random_vector(RANGE_BITS, rng),
            random_vector(RANGE_BITS, rng),
            rng,
        )?;

        // One-of-many commitments over the index bits.
        let a = random_vector(2 * m, rng);
        let b: Vec<Scalar> = index_bits(sender, m).chain(index_bits(receiver, m)).collect();
        let c: Vec<Scalar> = a
            .iter()
            .zip(&b)
            .map(|(a_k, b_k)| *a_k * (Fr::one() - b_k.double()))
            .collect();
        let mut d: Vec<Scalar> = a.iter().map(|a_k| -a_k.square()).collect();
        d.extend([a[0] * a[m]; 2]);
        let mut c_ext = c;
        c_ext.extend([a[(sender % 2) * m], -a[(receiver % 2) * m]]);

        let width = one_of_many_width(m);
        let anon_base = bases.base(width)?.clone();
        let big_a = VectorCommitment::commit(&anon_base, padded(&a, width), padded(&d, width), rng)?;
        let big_b =
            VectorCommitment::commit(&anon_base, padded(&b, width), padded(&c_ext, width), rng)?;

        let v = anonymity_challenge(&statement.hash(), &ba.point, &bs.point, &big_a.point, &big_b.point);

        // Selector aggregates.
        let p_polys = selector_polynomials(&a[..m], &b[..m]);
        let q_polys = selector_polynomials(&a[m..], &b[m..]);
        let key = statement.keys[sender];
        let left: Vec<Point> = statement.balances.iter().map(|c| c.left).collect();
        let right: Vec<Point> = statement.balances.iter().map(|c| c.right).collect();
        let weights = slot_weights(v, n);
        let amount = Fr::from(witness.amount);
        let outgoing = -amount - Fr::from(statement.fee);

        let phi = random_vector(m, rng);
        let chi = random_vector(m, rng);
        let psi = random_vector(m, rng);
        let omega = random_vector(m, rng);
        let mut cn_g = Vec::with_capacity(m);
        let mut c0_g = Vec::with_capacity(m);
        let mut y0_g = Vec::with_capacity(m);
        let mut cx_g = Vec::with_capacity(m);
        for k in 0..m {
            let column = coefficient_column(&p_polys, k);
            cn_g.push(ElGamal::new(
                multi_exp(&left, &column) + key * phi[k],
                multi_exp(&right, &column) + g * phi[k],
            ));
            c0_g.push(ElGamal::new(
                multi_exp(&statement.deltas, &column) + key * chi[k],
                g * chi[k],
            ));
            y0_g.push(ElGamal::new(
                multi_exp(&statement.keys, &column) + key * psi[k],
                g * psi[k],
            ));

            let cross: Scalar = (0..n)
                .map(|i| {
                    let polys = if i % 2 == 1 { &q_polys } else { &p_polys };
                    let shift = i - i % 2;
                    weights[i]
                        * (outgoing * polys[(sender + n - shift) % n][k]
                            + amount * polys[(receiver + n - shift) % n][k])
                })
                .sum();
            cx_g.push(ElGamal::new(statement.d * omega[k] + g * cross, g * omega[k]));
        }

        let w = selector_challenge(&v, &cn_g, &c0_g, &y0_g, &cx_g);
        let f: Vec<Scalar> = b.iter().zip(&a).map(|(b_k, a_k)| *b_k * w + a_k).collect();
        let z_a = big_b.randomness() * w + big_a.randomness();

        // Range polynomials l(X), r(X) and t(X) = <l(X), r(X)>.
        let rc = RangeChallenges::derive(&w);
        let l0: Vec<Scalar> = ba.g_values().iter().map(|bit| *bit - rc.z).collect();
        let l1 = bs.g_values().to_vec();
        let r0: Vec<Scalar> = (0..RANGE_BITS)
            .map(|i| rc.ys[i] * (ba.h_values()[i] + rc.z) + rc.tz[i])
            .collect();
        let r1: Vec<Scalar> = (0..RANGE_BITS).map(|i| rc.ys[i] * bs.h_values()[i]).collect();
        let t0 = inner_product(&l0, &r0);
        let t1 = inner_product(&l0, &r1) + inner_product(&l1, &r0);
        let t2 = inner_product(&l1, &r1);
        let big_t1 = PedersenCommitment::commit(t1, rng);
        let big_t2 = PedersenCommitment::commit(t2, rng);

        let x = polynomial_challenge(&rc.z, &big_t1.point, &big_t2.point);
        let t_hat = t0 + t1 * x + t2 * x.square();
        let tau_x = big_t1.randomness() * x + big_t2.randomness() * x.square();
        let mu = ba.randomness() + bs.randomness() * x;
        let l_vec: Vec<Scalar> = l0.iter().zip(&l1).map(|(c0, c1)| *c0 + *c1 * x).collect();
        let r_vec: Vec<Scalar> = r0.iter().zip(&r1).map(|(c0, c1)| *c0 + *c1 * x).collect();

        // Sigma protocol over the re-randomised aggregates.
        let w_m = w.pow([m as u64]);
        let cn_r_right = right[sender] * w_m - g * weighted_sum(&phi, w);
        let d_r = statement.d * w_m - g * weighted_sum(&chi, w);
        let g_r = g * (w_m - weighted_sum(&psi, w));
        let p: Vec<Scalar> = p_polys.iter().map(|poly| evaluate(poly, w)).collect();
        let q: Vec<Scalar> = q_polys.iter().map(|poly| evaluate(poly, w)).collect();
        let cx_right: Vec<Point> = cx_g.iter().map(|c| c.right).collect();
        let y_x_r = interleaved_sum(
            &correlate(&statement.keys, &p),
            &correlate(&statement.keys, &q),
            &weights,
        ) - multi_exp(&cx_right, &powers(w, m));

        let k_sk = random_scalar(rng);
        let k_r = random_scalar(rng);
        let k_b = random_scalar(rng);
        let k_tau = random_scalar(rng);
        let sigma = SigmaCommitments {
            a_y: g_r * k_sk,
            a_d: g * k_r,
            a_b: g * k_b + (d_r * (-rc.z2) + cn_r_right * rc.z3) * k_sk,
            a_x: y_x_r * k_r,
            a_t: -(g * k_b) + blinding_generator() * k_tau,
            a_u: epoch_generator(statement.epoch) * k_sk,
        };
        let challenge = sigma.challenge(&x);
        let remaining = Fr::from(witness.remaining);
        let s_sk = k_sk + challenge * witness.secret;
        let s_r = k_r + challenge * witness.randomness;
        let s_b = k_b + challenge * w_m * (amount * rc.z2 + remaining * rc.z3);
        let s_tau = k_tau + challenge * tau_x * w_m;

        // Inner-product argument against (h·o, hs ∘ y^-i).
        let o = Transcript::new().scalar(&challenge).challenge();
        let (h, hs) = bases.get_base(RANGE_BITS)?;
        let y_inv = rc.y.inverse().ok_or(ProofError::DegenerateChallenge)?;
        let reweighted: Vec<Point> = hs
            .iter()
            .zip(powers(y_inv, RANGE_BITS))
            .map(|(point, s)| *point * s)
            .collect();
        let inner = {
            let mut guard = bases.set_base(RANGE_BITS, h * o, reweighted)?;
            InnerProductProof::prove(&mut guard, l_vec, r_vec, o)?
        };

        debug!(size = n, "built transfer proof");
        Ok(Self {
            ba: ba.point,
            bs: bs.point,
            a: big_a.point,
            b: big_b.point,
            cn_g,
            c0_g,
            y0_g,
            cx_g,
            f,
            z_a,
            t1: big_t1.point,
            t2: big_t2.point,
            t_hat,
            mu,
            c: challenge,
            s_sk,
            s_r,
            s_b,
            s_tau,
            inner,
        })
    }

    /// Number of index bits `m` this proof was built for.
    pub fn index_bits(&self) -> usize {
        self.cn_g.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = ProofWriter::default();
        out.point(&self.ba)
            .point(&self.bs)
            .point(&self.a)
            .point(&self.b);
        for group in [&self.cn_g, &self.c0_g, &self.y0_g, &self.cx_g] {
            out.points(group.iter().map(|c| &c.left))
                .points(group.iter().map(|c| &c.right));
        }
        out.scalars(&self.f)
            .scalar(&self.z_a)
            .point(&self.t1)
            .point(&self.t2)
            .scalar(&self.t_hat)
            .scalar(&self.mu)
            .scalar(&self.c)
            .scalar(&self.s_sk)
            .scalar(&self.s_r)
            .scalar(&self.s_b)
            .scalar(&self.s_tau);
        self.inner.write(&mut out);
        out.finish()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        let m = bytes
            .len()
            .checked_sub(FIXED_LENGTH)
            .filter(|rest| *rest > 0 && rest % PER_BIT_LENGTH == 0)
            .map(|rest| rest / PER_BIT_LENGTH)
            .ok_or(EncodingError::InvalidLength {
                expected: FIXED_LENGTH + PER_BIT_LENGTH,
                actual: bytes.len(),
            })?;

        let mut input = ProofReader::new(bytes);
        let proof = Self {
            ba: input.point()?,
            bs: input.point()?,
            a: input.point()?,
            b: input.point()?,
            cn_g: read_ciphertexts(&mut input, m)?,
            c0_g: read_ciphertexts(&mut input, m)?,
            y0_g: read_ciphertexts(&mut input, m)?,
            cx_g: read_ciphertexts(&mut input, m)?,
            f: input.scalars(2 * m)?,
            z_a: input.scalar()?,
            t1: input.point()?,
            t2: input.point()?,
            t_hat: input.scalar()?,
            mu: input.scalar()?,
            c: input.scalar()?,
            s_sk: input.scalar()?,
            s_r: input.scalar()?,
            s_b: input.scalar()?,
            s_tau: input.scalar()?,
            inner: InnerProductProof::read(&mut input, INNER_PRODUCT_ROUNDS)?,
        };
        input.finish()?;
        Ok(proof)
    }
}

// ---------------------------------------------------------------------------
// Transcript pieces shared with the verifier
// ---------------------------------------------------------------------------

/// The six sigma-protocol commitments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SigmaCommitments {
    pub a_y: Point,
    pub a_d: Point,
    pub a_b: Point,
    pub a_x: Point,
    pub a_t: Point,
    pub a_u: Point,
}

impl SigmaCommitments {
    pub(crate) fn challenge(&self, x: &Scalar) -> Scalar {
        Transcript::new()
            .scalar(x)
            .point(&self.a_y)
            .point(&self.a_d)
            .point(&self.a_b)
            .point(&self.a_x)
            .point(&self.a_t)
            .point(&self.a_u)
            .challenge()
    }
}

/// Challenges `y`, `z` and the vectors derived from them.
pub(crate) struct RangeChallenges {
    pub y: Scalar,
    /// `y^i` for `i < 64`.
    pub ys: Vec<Scalar>,
    pub z: Scalar,
    pub z2: Scalar,
    pub z3: Scalar,
    /// `z^(2+i/32) · 2^(i%32)`.
    pub tz: Vec<Scalar>,
}

impl RangeChallenges {
    pub(crate) fn derive(w: &Scalar) -> Self {
        let y = Transcript::new().scalar(w).challenge();
        let z = Transcript::new().scalar(&y).challenge();
        let z2 = z.square();
        let z3 = z2 * z;
        let tz = (0..RANGE_BITS)
            .map(|i| {
                let limb = if i < LIMB_BITS { z2 } else { z3 };
                limb * Fr::from(1u64 << (i % LIMB_BITS))
            })
            .collect();
        Self {
            y,
            ys: powers(y, RANGE_BITS),
            z,
            z2,
            z3,
            tz,
        }
    }
}

pub(crate) fn anonymity_challenge(
    statement_hash: &Scalar,
    ba: &Point,
    bs: &Point,
    a: &Point,
    b: &Point,
) -> Scalar {
    Transcript::new()
        .scalar(statement_hash)
        .point(ba)
        .point(bs)
        .point(a)
        .point(b)
        .challenge()
}

pub(crate) fn selector_challenge(
    v: &Scalar,
    cn_g: &[ElGamal],
    c0_g: &[ElGamal],
    y0_g: &[ElGamal],
    cx_g: &[ElGamal],
) -> Scalar {
    let mut transcript = Transcript::new().scalar(v);
    for group in [cn_g, c0_g, y0_g, cx_g] {
        transcript = transcript
            .points(group.iter().map(|c| &c.left))
            .points(group.iter().map(|c| &c.right));
    }
    transcript.challenge()
}

pub(crate) fn polynomial_challenge(z: &Scalar, t1: &Point, t2: &Point) -> Scalar {
    Transcript::new().scalar(z).point(t1).point(t2).challenge()
}

/// Vector length of the one-of-many commitments: `2m` bits plus two
/// parity terms, rounded up to a power of two.
pub(crate) fn one_of_many_width(m: usize) -> usize {
    (2 * m + 2).next_power_of_two()
}

/// `m` left halves followed by `m` right halves.
fn read_ciphertexts(input: &mut ProofReader<'_>, m: usize) -> Result<Vec<ElGamal>, EncodingError> {
    let lefts = input.points(m)?;
    let rights = input.points(m)?;
    Ok(lefts
        .into_iter()
        .zip(rights)
        .map(|(l, r)| ElGamal::new(l, r))
        .collect())
}

fn padded(values: &[Scalar], len: usize) -> Vec<Scalar> {
    let mut out = values.to_vec();
    out.resize(len, Fr::from(0u64));
    out
}

fn random_vector<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Scalar> {
    (0..n).map(|_| random_scalar(rng)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::keys::Keypair;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    /// A consistent transfer of `amount` (fee 1) out of a sender holding
    /// `balance`, with every other slot holding a small random balance.
    pub(crate) fn fixture(
        n: usize,
        balance: u64,
        amount: u64,
        rng: &mut StdRng,
    ) -> (TransferStatement, TransferWitness) {
        let fee = 1u64;
        let keys: Vec<Keypair> = (0..n).map(|_| Keypair::generate(rng)).collect();
        let sender = rng.gen_range(0..n);
        let receiver = sender ^ 1;
        let g = generator();
        let r = random_scalar(rng);
        let d = g * r;

        let mut balances = Vec::with_capacity(n);
        let mut deltas = Vec::with_capacity(n);
        for (i, keypair) in keys.iter().enumerate() {
            let held = if i == sender { balance } else { rng.gen_range(0..50) };
            let (old, _) = ElGamal::encrypt(&keypair.public(), Fr::from(held), rng);
            let moved = if i == sender {
                -Fr::from(amount + fee)
            } else if i == receiver {
                Fr::from(amount)
            } else {
                Fr::from(0u64)
            };
            let delta = ElGamal::encrypt_with(&keypair.public(), moved, r);
            deltas.push(delta.left);
            balances.push(old + delta);
        }

        let epoch = 7;
        let statement = TransferStatement {
            balances,
            deltas,
            d,
            keys: keys.iter().map(Keypair::public).collect(),
            epoch,
            nonce: epoch_generator(epoch) * keys[sender].secret(),
            fee,
        };
        let witness = TransferWitness {
            secret: keys[sender].secret(),
            randomness: r,
            amount,
            remaining: balance - amount - fee,
            sender_index: sender,
            receiver_index: receiver,
        };
        (statement, witness)
    }

    #[test]
    fn serialized_length_depends_on_set_size() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bases = BaseTable::new();
        for n in [2usize, 4] {
            let (statement, witness) = fixture(n, 100, 10, &mut rng);
            let proof = TransferProof::prove(&mut bases, &statement, &witness, &mut rng).unwrap();
            let m = n.trailing_zeros() as usize;
            let bytes = proof.to_bytes();
            assert_eq!(bytes.len(), FIXED_LENGTH + m * PER_BIT_LENGTH);
            assert_eq!(TransferProof::from_bytes(&bytes).unwrap(), proof);
        }
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bases = BaseTable::new();
        let (statement, witness) = fixture(2, 100, 10, &mut rng);
        let bytes = TransferProof::prove(&mut bases, &statement, &witness, &mut rng)
            .unwrap()
            .to_bytes();
        assert!(TransferProof::from_bytes(&bytes[..bytes.len() - 32]).is_err());
        assert!(TransferProof::from_bytes(&bytes[..FIXED_LENGTH]).is_err());
    }

    #[test]
    fn proving_restores_bases() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bases = BaseTable::new();
        let before = bases.get_base(RANGE_BITS).unwrap();
        let (statement, witness) = fixture(4, 100, 10, &mut rng);
        TransferProof::prove(&mut bases, &statement, &witness, &mut rng).unwrap();
        assert_eq!(bases.get_base(RANGE_BITS).unwrap(), before);
    }

    #[test]
    fn rejects_bad_shapes() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bases = BaseTable::new();
        let (mut statement, mut witness) = fixture(4, 100, 10, &mut rng);

        witness.receiver_index = (witness.sender_index + 2) % 4;
        assert!(matches!(
            TransferProof::prove(&mut bases, &statement, &witness, &mut rng),
            Err(ProofError::SameParity { .. })
        ));

        witness.receiver_index = 9;
        assert!(matches!(
            TransferProof::prove(&mut bases, &statement, &witness, &mut rng),
            Err(ProofError::IndexOutOfRange { index: 9, size: 4 })
        ));

        statement.keys.pop();
        assert!(matches!(
            TransferProof::prove(&mut bases, &statement, &witness, &mut rng),
            Err(ProofError::AnonymitySetSize { size: 3 })
        ));
    }

    #[test]
    fn witness_debug_hides_secrets() {
        let mut rng = StdRng::seed_from_u64(42);
        let (_, witness) = fixture(2, 100, 10, &mut rng);
        let rendered = format!("{witness:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("amount"));
    }
}
