//! # Generator Bases
//!
//! Vector commitments of length `n` use generator vectors `gs[0..n]`,
//! `hs[0..n]` plus a blinding point `h`:
//!
//! ```text
//! gs[i] = hashToCurve(keccak("G" ‖ uint256(i)))
//! hs[i] = hashToCurve(keccak("H" ‖ uint256(i)))
//! h     = hashToCurve(keccak("H"))
//! ```
//!
//! A [`BaseTable`] caches one [`VectorBase`] per power-of-two length. It is
//! owned by the caller and passed into every prove/verify call; nothing here
//! is global.
//!
//! ## Substitution
//!
//! The range proof re-weights `hs` and `h` for its final opening, and every
//! inner-product round folds the bases in half. Both temporarily replace a
//! table entry through [`BaseTable::substitute`], which returns a
//! [`BaseGuard`]. Dropping the guard puts back whatever was there before
//! (or removes the entry if there was nothing), on every exit path
//! including `?` and panics. The guard derefs to the table, so nested
//! substitutions compose:
//!
//! ```
//! use zether_protocol::zkp::BaseTable;
//!
//! let mut table = BaseTable::new();
//! let original = table.base(4).unwrap().clone();
//! {
//!     let (left, right) = original.halves();
//!     let mut outer = table.substitute(2, left).unwrap();
//!     let _inner = outer.substitute(2, right).unwrap();
//! }
//! assert_eq!(table.base(4).unwrap(), &original);
//! assert_eq!(table.base(2).unwrap(), &original.halves().0);
//! ```

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use ark_bn254::Fr;
use tracing::debug;

use super::commitment::CommitmentError;
use crate::config::{BLINDING_GENERATOR_SEED, VALUE_GENERATOR_SEED};
use crate::crypto::curve::{blinding_generator, hash_to_curve, Point};
use crate::crypto::hash::{keccak256, word};

/// One set of commitment generators for a fixed power-of-two length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorBase {
    gs: Vec<Point>,
    hs: Vec<Point>,
    h: Point,
}

impl VectorBase {
    /// Derive the canonical base of length `n`.
    pub fn derive(n: usize) -> Result<Self, CommitmentError> {
        check_length(n)?;
        let gs = (0..n).map(|i| indexed_generator(VALUE_GENERATOR_SEED, i)).collect();
        let hs = (0..n).map(|i| indexed_generator(BLINDING_GENERATOR_SEED, i)).collect();
        Ok(Self {
            gs,
            hs,
            h: blinding_generator(),
        })
    }

    /// Assemble a base from explicit generators.
    pub fn new(gs: Vec<Point>, hs: Vec<Point>, h: Point) -> Result<Self, CommitmentError> {
        if gs.len() != hs.len() {
            return Err(CommitmentError::LengthMismatch {
                left: gs.len(),
                right: hs.len(),
            });
        }
        check_length(gs.len())?;
        Ok(Self { gs, hs, h })
    }

    /// Same `gs`, replaced blinding pair `(h, hs)`.
    pub fn reblinded(&self, h: Point, hs: Vec<Point>) -> Result<Self, CommitmentError> {
        Self::new(self.gs.clone(), hs, h)
    }

    pub fn len(&self) -> usize {
        self.gs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gs.is_empty()
    }

    pub fn gs(&self) -> &[Point] {
        &self.gs
    }

    pub fn hs(&self) -> &[Point] {
        &self.hs
    }

    pub fn h(&self) -> Point {
        self.h
    }

    /// Left and right halves, each keeping `h`.
    pub fn halves(&self) -> (Self, Self) {
        let mid = self.len() / 2;
        (
            Self {
                gs: self.gs[..mid].to_vec(),
                hs: self.hs[..mid].to_vec(),
                h: self.h,
            },
            Self {
                gs: self.gs[mid..].to_vec(),
                hs: self.hs[mid..].to_vec(),
                h: self.h,
            },
        )
    }

    /// Inner-product fold: `gs' = gL·x⁻¹ + gR·x`, `hs' = hL·x + hR·x⁻¹`.
    pub fn fold(&self, x: Fr, x_inv: Fr) -> Self {
        let mid = self.len() / 2;
        let gs = (0..mid)
            .map(|i| self.gs[i] * x_inv + self.gs[mid + i] * x)
            .collect();
        let hs = (0..mid)
            .map(|i| self.hs[i] * x + self.hs[mid + i] * x_inv)
            .collect();
        Self { gs, hs, h: self.h }
    }
}

/// Caller-owned cache of bases keyed by length.
#[derive(Debug, Default)]
pub struct BaseTable {
    bases: BTreeMap<usize, VectorBase>,
}

impl BaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The base for length `n`, derived on first use.
    pub fn base(&mut self, n: usize) -> Result<&VectorBase, CommitmentError> {
        check_length(n)?;
        if !self.bases.contains_key(&n) {
            debug!(n, "deriving vector commitment base");
            self.bases.insert(n, VectorBase::derive(n)?);
        }
        self.bases.get(&n).ok_or(CommitmentError::NotPowerOfTwo { len: n })
    }

    /// The cached `(h, hs)` pair for length `n`.
    pub fn get_base(&mut self, n: usize) -> Result<(Point, Vec<Point>), CommitmentError> {
        let base = self.base(n)?;
        Ok((base.h(), base.hs().to_vec()))
    }

    /// Replace the `(h, hs)` pair for length `n` until the guard drops.
    pub fn set_base(
        &mut self,
        n: usize,
        h: Point,
        hs: Vec<Point>,
    ) -> Result<BaseGuard<'_>, CommitmentError> {
        let base = self.base(n)?.reblinded(h, hs)?;
        self.substitute(n, base)
    }

    /// Replace the whole entry for `base.len()` until the guard drops.
    pub fn substitute(
        &mut self,
        n: usize,
        base: VectorBase,
    ) -> Result<BaseGuard<'_>, CommitmentError> {
        if base.len() != n {
            return Err(CommitmentError::LengthMismatch {
                left: n,
                right: base.len(),
            });
        }
        let previous = self.bases.insert(n, base);
        Ok(BaseGuard {
            table: self,
            n,
            previous,
        })
    }
}

/// Restores a [`BaseTable`] entry on drop.
pub struct BaseGuard<'a> {
    table: &'a mut BaseTable,
    n: usize,
    previous: Option<VectorBase>,
}

impl Deref for BaseGuard<'_> {
    type Target = BaseTable;

    fn deref(&self) -> &BaseTable {
        &*self.table
    }
}

impl DerefMut for BaseGuard<'_> {
    fn deref_mut(&mut self) -> &mut BaseTable {
        &mut *self.table
    }
}

impl Drop for BaseGuard<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(base) => {
                self.table.bases.insert(self.n, base);
            }
            None => {
                self.table.bases.remove(&self.n);
            }
        }
    }
}

fn indexed_generator(seed: &[u8], index: usize) -> Point {
    let mut preimage = seed.to_vec();
    preimage.extend_from_slice(&word(index as u64));
    hash_to_curve(&keccak256(&preimage))
}

fn check_length(n: usize) -> Result<(), CommitmentError> {
    if n == 0 || !n.is_power_of_two() {
        return Err(CommitmentError::NotPowerOfTwo { len: n });
    }
    Ok(())
}
