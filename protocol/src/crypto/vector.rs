//! Scalar-vector and multi-exponentiation helpers shared by the range proof,
//! the inner-product argument and the anonymity-set aggregates.

use ark_bn254::{Fr, G1Projective};
use ark_ec::{CurveGroup, VariableBaseMSM};
use ark_ff::{batch_inversion, One, Zero};

use super::curve::{Point, Scalar};

/// `Σ a_i·b_i`. Extra elements of the longer slice are ignored.
pub fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b).map(|(x, y)| *x * y).sum()
}

/// Elementwise product.
pub fn hadamard(a: &[Scalar], b: &[Scalar]) -> Vec<Scalar> {
    a.iter().zip(b).map(|(x, y)| *x * y).collect()
}

/// `[1, base, base², …]` with `n` entries.
pub fn powers(base: Scalar, n: usize) -> Vec<Scalar> {
    let mut out = Vec::with_capacity(n);
    let mut acc = Fr::one();
    for _ in 0..n {
        out.push(acc);
        acc *= base;
    }
    out
}

/// `Σ w^k·x_k`.
pub fn weighted_sum(xs: &[Scalar], w: Scalar) -> Scalar {
    xs.iter()
        .rev()
        .fold(Fr::zero(), |acc, x| acc * w + x)
}

/// `Σ s_i·P_i`. Extra elements of the longer slice are ignored.
pub fn multi_exp(points: &[Point], scalars: &[Scalar]) -> Point {
    let n = points.len().min(scalars.len());
    let bases = G1Projective::normalize_batch(&points[..n]);
    G1Projective::msm_unchecked(&bases, &scalars[..n])
}

/// Montgomery batch inversion. Zero entries stay zero.
pub fn inverses(xs: &[Scalar]) -> Vec<Scalar> {
    let mut out = xs.to_vec();
    batch_inversion(&mut out);
    out
}
