//! Anonymity-set construction.
//!
//! The set is `[sender, receiver, decoys...]`, shuffled with Fisher–Yates
//! using `gen_range` (uniform, no modulo bias). The transfer proof
//! interleaves even and odd slots, so the sender and receiver must end up
//! with opposite parities; when the shuffle puts them on the same parity
//! the receiver swaps with its neighbour (`index ^ 1`).

use ark_std::rand::Rng;

use super::AccountError;
use crate::crypto::curve::Point;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnonymitySet {
    keys: Vec<Point>,
    sender: usize,
    receiver: usize,
}

impl AnonymitySet {
    /// Reject sizes that are not a power of two, saying how far the nearest
    /// valid sizes are.
    pub fn validate_size(size: usize) -> Result<(), AccountError> {
        if size.is_power_of_two() {
            return Ok(());
        }
        let next = size.next_power_of_two();
        let previous = next / 2;
        Err(AccountError::AnonymitySetSize {
            size,
            add: next - size,
            remove: size - previous,
        })
    }

    /// Shuffle `[sender, receiver, decoys...]`.
    pub fn shuffle<R: Rng + ?Sized>(
        sender: Point,
        receiver: Point,
        decoys: &[Point],
        rng: &mut R,
    ) -> Result<Self, AccountError> {
        let mut keys = Vec::with_capacity(decoys.len() + 2);
        keys.push(sender);
        keys.push(receiver);
        keys.extend_from_slice(decoys);
        Self::validate_size(keys.len())?;

        // Track where the two original slots travel.
        let mut order: Vec<usize> = (0..keys.len()).collect();
        for i in (1..keys.len()).rev() {
            let j = rng.gen_range(0..=i);
            keys.swap(i, j);
            order.swap(i, j);
        }
        let position = |original: usize| order.iter().position(|o| *o == original).unwrap_or(0);
        let sender = position(0);
        let mut receiver = position(1);

        if sender % 2 == receiver % 2 {
            let neighbour = receiver ^ 1;
            keys.swap(receiver, neighbour);
            receiver = neighbour;
        }
        Ok(Self {
            keys,
            sender,
            receiver,
        })
    }

    pub fn keys(&self) -> &[Point] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn sender_index(&self) -> usize {
        self.sender
    }

    pub fn receiver_index(&self) -> usize {
        self.receiver
    }
}
