//! Selector polynomials for the one-of-many part of the transfer proof.
//!
//! For an index `l` written in `m` bits and per-bit blinders `a_k`, slot `i`
//! of the anonymity set gets
//!
//! ```text
//! P_i(X) = Π_k  (bit_k(i) ? a_k + b_k·X : −a_k + (1 − b_k)·X)
//! ```
//!
//! where `b_k = bit_k(l)`. Every factor has an `X` term only when
//! `bit_k(i) == bit_k(l)`, so the degree-`m` coefficient is 1 at `i == l`
//! and 0 everywhere else. The verifier sees only `f_k = b_k·w + a_k` and
//! evaluates the same products at `w` with [`evaluate_selectors`].

use ark_bn254::Fr;
use ark_ff::{One, Zero};

use crate::crypto::curve::{Point, Scalar};
use crate::crypto::vector::{multi_exp, powers};

/// Coefficient vectors (length `m + 1`, constant term first) of `P_i` for
/// every `i < 2^m`. `a` and `b` must have the same length `m`.
pub fn selector_polynomials(a: &[Scalar], b: &[Scalar]) -> Vec<Vec<Scalar>> {
    let mut polys = vec![vec![Fr::one()]];
    for (a_k, b_k) in a.iter().zip(b) {
        let clear = [-*a_k, Fr::one() - b_k];
        let set = [*a_k, *b_k];
        // Slots with bit k clear keep their index; slots with it set move up
        // by 2^k.
        let mut next = Vec::with_capacity(2 * polys.len());
        next.extend(polys.iter().map(|p| times_linear(p, clear)));
        next.extend(polys.iter().map(|p| times_linear(p, set)));
        polys = next;
    }
    polys
}

/// `P_i(w)` for every slot, computed from the blinded bits `f_k` alone.
pub fn evaluate_selectors(f: &[Scalar], w: Scalar) -> Vec<Scalar> {
    let mut values = vec![Fr::one()];
    for f_k in f {
        let clear = w - f_k;
        let mut next = Vec::with_capacity(2 * values.len());
        next.extend(values.iter().map(|v| *v * clear));
        next.extend(values.iter().map(|v| *v * f_k));
        values = next;
    }
    values
}

/// Column `k` of the coefficient matrix: the `X^k` coefficient of each `P_i`.
pub fn coefficient_column(polys: &[Vec<Scalar>], k: usize) -> Vec<Scalar> {
    polys.iter().map(|p| p[k]).collect()
}

/// Evaluate a polynomial given by its coefficients at `x`.
pub fn evaluate(coefficients: &[Scalar], x: Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Fr::zero(), |acc, c| acc * x + c)
}

/// Cyclic correlation by even shifts:
///
/// ```text
/// out[t] = Σ_j points[j] · exponents[(j − 2t) mod N],   t < N/2
/// ```
pub fn correlate(points: &[Point], exponents: &[Scalar]) -> Vec<Point> {
    let n = points.len();
    (0..n / 2)
        .map(|t| {
            let shifted: Vec<Scalar> = (0..n)
                .map(|j| exponents[(j + n - (2 * t) % n) % n])
                .collect();
            multi_exp(points, &shifted)
        })
        .collect()
}

/// Weights `[1, 1, v, v², …, v^(N−2)]` that fold the per-slot cross terms
/// into a single point.
pub fn slot_weights(v: Scalar, n: usize) -> Vec<Scalar> {
    let mut weights = vec![Fr::one()];
    weights.extend(powers(v, n.saturating_sub(1)));
    weights.truncate(n);
    weights
}

/// `Σ_i weights_i · (i odd ? odd : even)[i / 2]`.
pub fn interleaved_sum(even: &[Point], odd: &[Point], weights: &[Scalar]) -> Point {
    let points: Vec<Point> = (0..weights.len())
        .map(|i| if i % 2 == 1 { odd[i / 2] } else { even[i / 2] })
        .collect();
    multi_exp(&points, weights)
}

/// Bits of `index`, least significant first.
pub fn index_bits(index: usize, m: usize) -> impl Iterator<Item = Scalar> {
    (0..m).map(move |k| Fr::from(((index >> k) & 1) as u64))
}

fn times_linear(poly: &[Scalar], [constant, linear]: [Scalar; 2]) -> Vec<Scalar> {
    let mut out = vec![Fr::zero(); poly.len() + 1];
    for (i, c) in poly.iter().enumerate() {
        out[i] += *c * constant;
        out[i + 1] += *c * linear;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::{generator, random_scalar};
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn leading_coefficient_marks_the_index() {
        let mut rng = StdRng::seed_from_u64(42);
        let m = 3;
        let index = 5;
        let a: Vec<Fr> = (0..m).map(|_| random_scalar(&mut rng)).collect();
        let b: Vec<Fr> = index_bits(index, m).collect();
        let polys = selector_polynomials(&a, &b);
        assert_eq!(polys.len(), 8);
        for (i, p) in polys.iter().enumerate() {
            assert_eq!(p.len(), m + 1);
            let expected = if i == index { Fr::one() } else { Fr::zero() };
            assert_eq!(p[m], expected);
        }
    }

    #[test]
    fn verifier_evaluation_matches_polynomials() {
        let mut rng = StdRng::seed_from_u64(42);
        let m = 3;
        let a: Vec<Fr> = (0..m).map(|_| random_scalar(&mut rng)).collect();
        let b: Vec<Fr> = index_bits(6, m).collect();
        let w = random_scalar(&mut rng);
        let f: Vec<Fr> = a.iter().zip(&b).map(|(a, b)| *b * w + a).collect();

        let polys = selector_polynomials(&a, &b);
        let evaluated = evaluate_selectors(&f, w);
        for (p, value) in polys.iter().zip(&evaluated) {
            assert_eq!(evaluate(p, w), *value);
        }
    }

    #[test]
    fn correlation_shifts_by_two() {
        let g = generator();
        let points: Vec<Point> = (1..=4u64).map(|i| g * Fr::from(i)).collect();
        let exps = [Fr::from(1u64), Fr::zero(), Fr::zero(), Fr::zero()];
        // out[t] picks the point whose exponent index (j - 2t) is zero.
        assert_eq!(correlate(&points, &exps), vec![points[0], points[2]]);
    }

    #[test]
    fn slot_weights_layout() {
        let v = Fr::from(3u64);
        assert_eq!(
            slot_weights(v, 4),
            vec![Fr::one(), Fr::one(), Fr::from(3u64), Fr::from(9u64)]
        );
        assert_eq!(slot_weights(v, 2), vec![Fr::one(), Fr::one()]);
    }
}
