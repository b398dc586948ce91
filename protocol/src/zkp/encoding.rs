//! Fixed-order byte layout shared by every proof type: points are 64-byte
//! `x ‖ y` words, scalars 32-byte words, concatenated with no framing.

use crate::config::{POINT_LENGTH, SCALAR_LENGTH};
use crate::crypto::curve::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, EncodingError, Point,
    Scalar,
};

#[derive(Default)]
pub(crate) struct ProofWriter {
    bytes: Vec<u8>,
}

impl ProofWriter {
    pub(crate) fn point(&mut self, p: &Point) -> &mut Self {
        self.bytes.extend_from_slice(&point_to_bytes(p));
        self
    }

    pub(crate) fn points<'a>(&mut self, ps: impl IntoIterator<Item = &'a Point>) -> &mut Self {
        for p in ps {
            self.point(p);
        }
        self
    }

    pub(crate) fn scalar(&mut self, s: &Scalar) -> &mut Self {
        self.bytes.extend_from_slice(&scalar_to_bytes(s));
        self
    }

    pub(crate) fn scalars<'a>(&mut self, ss: impl IntoIterator<Item = &'a Scalar>) -> &mut Self {
        for s in ss {
            self.scalar(s);
        }
        self
    }

    pub(crate) fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

pub(crate) struct ProofReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ProofReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        if self.bytes.len() < n {
            return Err(EncodingError::InvalidLength {
                expected: n,
                actual: self.bytes.len(),
            });
        }
        let (head, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        Ok(head)
    }

    pub(crate) fn point(&mut self) -> Result<Point, EncodingError> {
        point_from_bytes(self.take(POINT_LENGTH)?)
    }

    pub(crate) fn points(&mut self, n: usize) -> Result<Vec<Point>, EncodingError> {
        (0..n).map(|_| self.point()).collect()
    }

    pub(crate) fn scalar(&mut self) -> Result<Scalar, EncodingError> {
        scalar_from_bytes(self.take(SCALAR_LENGTH)?)
    }

    pub(crate) fn scalars(&mut self, n: usize) -> Result<Vec<Scalar>, EncodingError> {
        (0..n).map(|_| self.scalar()).collect()
    }

    /// Fails unless every byte was consumed.
    pub(crate) fn finish(self) -> Result<(), EncodingError> {
        if !self.bytes.is_empty() {
            return Err(EncodingError::InvalidLength {
                expected: 0,
                actual: self.bytes.len(),
            });
        }
        Ok(())
    }
}
