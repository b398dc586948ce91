//! # Proof Verification
//!
//! The checks a ledger runs before it accepts a transfer or a withdrawal.
//! Every step recomputes the prover's transcript from public data, so any
//! single changed byte in the statement or the proof surfaces as one of
//! the [`VerificationError`] variants below rather than a panic.
//!
//! Transfer checks run in order:
//!
//! 1. **shape**: set size is a power of two, every per-bit vector has `m`
//!    entries;
//! 2. **one-of-many opening**: `A + w·B` opens to `f` and the quadratic
//!    terms that force `b ∈ {0,1}` and opposite parities;
//! 3. **sigma challenge**: the six commitments rebuilt from the responses
//!    hash back to `c`;
//! 4. **inner product**: the range-proof vector opens to `tHat`.

use ark_bn254::Fr;
use ark_ff::Field;
use tracing::debug;

use super::bases::BaseTable;
use super::burn::{BurnCommitments, BurnProof, BurnStatement};
use super::error::VerificationError;
use super::polynomial::{correlate, evaluate_selectors, interleaved_sum, slot_weights};
use super::transfer::{
    anonymity_challenge, one_of_many_width, polynomial_challenge, selector_challenge,
    RangeChallenges, SigmaCommitments, TransferProof, TransferStatement,
};
use crate::config::{MAX_BALANCE, RANGE_BITS};
use crate::crypto::curve::{blinding_generator, epoch_generator, generator, Point, Scalar};
use crate::crypto::encryption::ElGamal;
use crate::crypto::hash::Transcript;
use crate::crypto::vector::{inverses, multi_exp, powers};

/// Verify a transfer proof against its statement.
pub fn verify_transfer(
    bases: &mut BaseTable,
    statement: &TransferStatement,
    proof: &TransferProof,
) -> Result<(), VerificationError> {
    let m = statement
        .index_bits()
        .map_err(|e| VerificationError::Malformed(e.to_string()))?;
    let n = statement.size();
    for (field, actual, expected) in [
        ("CnG", proof.cn_g.len(), m),
        ("C0G", proof.c0_g.len(), m),
        ("y0G", proof.y0_g.len(), m),
        ("CXG", proof.cx_g.len(), m),
        ("f", proof.f.len(), 2 * m),
    ] {
        if actual != expected {
            return Err(VerificationError::Malformed(format!(
                "{field} has {actual} entries, expected {expected}"
            )));
        }
    }
    let g = generator();
    let h = blinding_generator();

    let v = anonymity_challenge(&statement.hash(), &proof.ba, &proof.bs, &proof.a, &proof.b);
    let w = selector_challenge(&v, &proof.cn_g, &proof.c0_g, &proof.y0_g, &proof.cx_g);
    let f = &proof.f;

    // One-of-many opening.
    let width = one_of_many_width(m);
    let anon_base = bases.base(width)?.clone();
    let mut quadratic: Vec<Scalar> = f.iter().map(|f_k| *f_k * (w - f_k)).collect();
    quadratic.push(f[0] * f[m]);
    quadratic.push((w - f[0]) * (w - f[m]));
    let opened = h * proof.z_a
        + multi_exp(&anon_base.gs()[..2 * m], f)
        + multi_exp(&anon_base.hs()[..2 * m + 2], &quadratic);
    if proof.a + proof.b * w != opened {
        return Err(VerificationError::AnonymityOpening);
    }

    // Re-randomised aggregates.
    let p = evaluate_selectors(&f[..m], w);
    let q = evaluate_selectors(&f[m..], w);
    let w_powers = powers(w, m);
    let w_m = w.pow([m as u64]);
    let fee = Fr::from(statement.fee);
    let aggregate = |group: &[ElGamal]| {
        let lefts: Vec<Point> = group.iter().map(|c| c.left).collect();
        let rights: Vec<Point> = group.iter().map(|c| c.right).collect();
        (multi_exp(&lefts, &w_powers), multi_exp(&rights, &w_powers))
    };
    let (cn_left, cn_right) = aggregate(&proof.cn_g);
    let (c0_left, c0_right) = aggregate(&proof.c0_g);
    let (y0_left, y0_right) = aggregate(&proof.y0_g);
    let (cx_left, cx_right) = aggregate(&proof.cx_g);

    let lefts: Vec<Point> = statement.balances.iter().map(|c| c.left).collect();
    let rights: Vec<Point> = statement.balances.iter().map(|c| c.right).collect();
    let cln_r = multi_exp(&lefts, &p) - cn_left;
    let crn_r = multi_exp(&rights, &p) - cn_right;
    let cl_r = multi_exp(&statement.deltas, &p) - c0_left;
    let d_r = statement.d * w_m - c0_right;
    let y_r = multi_exp(&statement.keys, &p) - y0_left;
    let g_r = g * w_m - y0_right;

    let weights = slot_weights(v, n);
    let cx_r = g * (fee * w_m) - cx_left
        + interleaved_sum(
            &correlate(&statement.deltas, &p),
            &correlate(&statement.deltas, &q),
            &weights,
        );
    let y_x_r = interleaved_sum(
        &correlate(&statement.keys, &p),
        &correlate(&statement.keys, &q),
        &weights,
    ) - cx_right;

    // Sigma protocol.
    let rc = RangeChallenges::derive(&w);
    let x = polynomial_challenge(&rc.z, &proof.t1, &proof.t2);
    let y_sum: Scalar = rc.ys.iter().sum();
    let delta = (rc.z - rc.z2) * y_sum - (rc.z3 + rc.z3 * rc.z) * Fr::from(MAX_BALANCE);
    let c = proof.c;
    let recomputed = SigmaCommitments {
        a_y: g_r * proof.s_sk - y_r * c,
        a_d: g * proof.s_r - statement.d * c,
        a_b: g * proof.s_b + (d_r * (-rc.z2) + crn_r * rc.z3) * proof.s_sk
            - (cl_r * (-rc.z2) + cln_r * rc.z3 - g * (rc.z2 * fee * w_m)) * c,
        a_x: y_x_r * proof.s_r - cx_r * c,
        a_t: h * proof.s_tau - g * proof.s_b
            + (g * (proof.t_hat - delta) - proof.t1 * x - proof.t2 * x.square()) * (c * w_m),
        a_u: epoch_generator(statement.epoch) * proof.s_sk - statement.nonce * c,
    };
    if recomputed.challenge(&x) != c {
        return Err(VerificationError::SigmaChallenge);
    }

    // Inner-product argument.
    let o = Transcript::new().scalar(&c).challenge();
    let range_base = bases.base(RANGE_BITS)?.clone();
    let y_inverses = inverses(&rc.ys);
    let reweighted: Vec<Point> = range_base
        .hs()
        .iter()
        .zip(&y_inverses)
        .map(|(point, s)| *point * s)
        .collect();
    let h_scalars: Vec<Scalar> = (0..RANGE_BITS)
        .map(|i| rc.z * rc.ys[i] + rc.tz[i])
        .collect();
    let u = h * o;
    let commitment = proof.ba + proof.bs * x - h * proof.mu
        + multi_exp(range_base.gs(), &vec![-rc.z; RANGE_BITS])
        + multi_exp(&reweighted, &h_scalars)
        + u * proof.t_hat;
    let ipa_base = range_base.reblinded(u, reweighted)?;
    proof.inner.verify(&ipa_base, commitment, o)?;

    debug!(size = n, "transfer proof verified");
    Ok(())
}

/// Verify a burn proof against its statement.
pub fn verify_burn(statement: &BurnStatement, proof: &BurnProof) -> Result<(), VerificationError> {
    let g = generator();
    let c = proof.c;
    let recomputed = BurnCommitments {
        a_y: g * proof.s_sk - statement.key * c,
        a_b: g * proof.s_b + statement.balance.right * proof.s_sk - statement.balance.left * c,
        a_u: epoch_generator(statement.epoch) * proof.s_sk - statement.nonce * c,
    };
    if recomputed.challenge(&statement.hash()) != c {
        return Err(VerificationError::SigmaChallenge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;
    use crate::crypto::keys::{Address, Keypair};
    use crate::zkp::burn::BurnWitness;
    use crate::zkp::transfer::tests::fixture;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn proven(n: usize, seed: u64) -> (BaseTable, TransferStatement, TransferProof) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bases = BaseTable::new();
        let (statement, witness) = fixture(n, 100, 10, &mut rng);
        let proof = TransferProof::prove(&mut bases, &statement, &witness, &mut rng).unwrap();
        (bases, statement, proof)
    }

    #[test]
    fn transfer_verifies_for_each_size() {
        for n in [2usize, 4, 8] {
            let (mut bases, statement, proof) = proven(n, 42);
            verify_transfer(&mut bases, &statement, &proof).unwrap();
        }
    }

    #[test]
    fn verifies_after_wire_round_trip() {
        let (mut bases, statement, proof) = proven(4, 42);
        let decoded = TransferProof::from_bytes(&proof.to_bytes()).unwrap();
        verify_transfer(&mut bases, &statement, &decoded).unwrap();
    }

    #[test]
    fn incremented_response_is_rejected() {
        let (mut bases, statement, proof) = proven(4, 42);
        for tweak in 0..4 {
            let mut bad = proof.clone();
            match tweak {
                0 => bad.s_sk += Fr::one(),
                1 => bad.s_r += Fr::one(),
                2 => bad.s_b += Fr::one(),
                _ => bad.s_tau += Fr::one(),
            }
            assert!(matches!(
                verify_transfer(&mut bases, &statement, &bad),
                Err(VerificationError::SigmaChallenge)
            ));
        }
    }

    #[test]
    fn tampered_parts_name_the_failed_check() {
        let (mut bases, statement, proof) = proven(4, 42);
        let g = generator();

        let mut bad = proof.clone();
        bad.f[0] += Fr::one();
        assert!(matches!(
            verify_transfer(&mut bases, &statement, &bad),
            Err(VerificationError::AnonymityOpening)
        ));

        let mut bad = proof.clone();
        bad.t_hat += Fr::one();
        assert!(matches!(
            verify_transfer(&mut bases, &statement, &bad),
            Err(VerificationError::SigmaChallenge)
        ));

        let mut bad = proof.clone();
        bad.inner.a += Fr::one();
        assert!(matches!(
            verify_transfer(&mut bases, &statement, &bad),
            Err(VerificationError::InnerProduct)
        ));

        let mut bad = proof.clone();
        bad.f.pop();
        assert!(matches!(
            verify_transfer(&mut bases, &statement, &bad),
            Err(VerificationError::Malformed(_))
        ));

        let mut other = statement.clone();
        other.nonce += g;
        assert!(verify_transfer(&mut bases, &other, &proof).is_err());

        let mut other = statement.clone();
        other.fee += 1;
        assert!(verify_transfer(&mut bases, &other, &proof).is_err());
    }

    #[test]
    fn overdrawn_sender_does_not_verify() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut bases = BaseTable::new();
        // A residual wider than 32 bits is not caught while proving.
        let (statement, mut witness) = fixture(2, 100, 10, &mut rng);
        witness.remaining = 1 << 33;
        let proof = TransferProof::prove(&mut bases, &statement, &witness, &mut rng).unwrap();
        assert!(verify_transfer(&mut bases, &statement, &proof).is_err());
    }

    #[test]
    fn verification_leaves_bases_untouched() {
        let (mut bases, statement, proof) = proven(2, 42);
        let before = bases.get_base(RANGE_BITS).unwrap();
        verify_transfer(&mut bases, &statement, &proof).unwrap();
        assert_eq!(bases.get_base(RANGE_BITS).unwrap(), before);
    }

    fn burn_fixture(rng: &mut StdRng) -> (BurnStatement, BurnWitness) {
        let keypair = Keypair::generate(rng);
        let (account, _) = ElGamal::encrypt(&keypair.public(), Fr::from(30u64), rng);
        let epoch = 11;
        let statement = BurnStatement {
            balance: account.plus(-Fr::from(12u64)),
            key: keypair.public(),
            epoch,
            nonce: epoch_generator(epoch) * keypair.secret(),
            sender: Address::random(rng),
        };
        let witness = BurnWitness {
            secret: keypair.secret(),
            remaining: 18,
        };
        (statement, witness)
    }

    #[test]
    fn burn_verifies() {
        let mut rng = StdRng::seed_from_u64(42);
        let (statement, witness) = burn_fixture(&mut rng);
        let proof = BurnProof::prove(&statement, &witness, &mut rng);
        verify_burn(&statement, &proof).unwrap();
    }

    #[test]
    fn burn_rejects_wrong_balance_or_sender() {
        let mut rng = StdRng::seed_from_u64(42);
        let (statement, mut witness) = burn_fixture(&mut rng);

        let proof = BurnProof::prove(&statement, &witness, &mut rng);
        let mut other = statement.clone();
        other.sender = Address::random(&mut rng);
        assert!(verify_burn(&other, &proof).is_err());

        let mut bad = proof;
        bad.s_sk += Fr::one();
        assert!(matches!(
            verify_burn(&statement, &bad),
            Err(VerificationError::SigmaChallenge)
        ));

        witness.remaining = 19;
        let proof = BurnProof::prove(&statement, &witness, &mut rng);
        assert!(verify_burn(&statement, &proof).is_err());
    }
}
