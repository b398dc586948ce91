//! # Protocol Configuration & Constants
//!
//! Every magic number in the protocol lives here. The generator seeds and
//! bit widths are part of the wire contract with the ledger verifier:
//! changing any of them produces proofs that no deployed verifier accepts.
//!
//! Runtime knobs that a wallet may legitimately tune live in
//! [`ClientConfig`]; ledger-wide parameters (epoch length, fee) are owned by
//! the ledger and fetched at registration time.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Generator Seeds
// ---------------------------------------------------------------------------

/// Seed for the value generator `g`. Keys, ElGamal, Pedersen and the range
/// proof all share this one generator.
pub const VALUE_GENERATOR_SEED: &[u8] = b"G";

/// Seed for the blinding generator `h`.
pub const BLINDING_GENERATOR_SEED: &[u8] = b"H";

/// Seed prefix for the per-epoch nonce generator `gEpoch`.
pub const EPOCH_GENERATOR_SEED: &[u8] = b"Zether";

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialized scalar / field element length (one big-endian word).
pub const SCALAR_LENGTH: usize = 32;

/// Serialized point length (two big-endian words).
pub const POINT_LENGTH: usize = 2 * SCALAR_LENGTH;

/// Ledger addresses are 20 bytes, left-padded to a word in transcripts.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Range Proof
// ---------------------------------------------------------------------------

/// Bits per range-proof limb. Both the transfer amount and the sender's
/// remaining balance must fit in one limb.
pub const LIMB_BITS: usize = 32;

/// Total range-proof width: transfer amount ‖ remaining balance.
pub const RANGE_BITS: usize = 2 * LIMB_BITS;

/// Inner-product rounds for a `RANGE_BITS` opening.
pub const INNER_PRODUCT_ROUNDS: usize = RANGE_BITS.trailing_zeros() as usize;

/// Largest balance the protocol can represent, and the bound handed to the
/// linear-search decryption.
pub const MAX_BALANCE: u64 = (1 << LIMB_BITS) - 1;

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// Proving-time estimate: milliseconds per `size * log2(size)` unit.
pub const ESTIMATE_MILLIS_PER_UNIT: f64 = 20.0;

/// Proving-time estimate: fixed overhead in milliseconds.
pub const ESTIMATE_BASE_MILLIS: f64 = 5200.0;

/// Extra slack added when suggesting a deployment epoch length, so the
/// submission callback has room to fire before the boundary.
pub const ESTIMATE_LEDGER_MARGIN_MILLIS: u64 = 20;

/// A withdrawal is only attempted when at least this much of the epoch
/// remains. Calibrated against a one-second block time.
pub const BURN_LATENCY_MILLIS: u64 = 3100;

/// Largest key-rotation delta. Deltas are drawn from `1..=MAX_KEY_DELTA` so
/// receivers can recover them with a short linear search.
pub const MAX_KEY_DELTA: u64 = 255;

/// Capacity of the ledger's transfer-event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Client Configuration
// ---------------------------------------------------------------------------

/// Per-wallet runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Rotate every party's key by a fresh random delta on each transfer.
    pub rotate_keys: bool,
    /// Upper bound on consecutive epoch-boundary deferrals of one operation
    /// before it is abandoned.
    pub max_deferrals: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rotate_keys: false,
            max_deferrals: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_layout() {
        assert_eq!(RANGE_BITS, 64);
        assert_eq!(INNER_PRODUCT_ROUNDS, 6);
        assert_eq!(MAX_BALANCE, 4_294_967_295);
    }

    #[test]
    fn test_client_config_defaults_fill_missing_fields() {
        let config: ClientConfig = serde_json::from_str(r#"{"rotate_keys": true}"#).unwrap();
        assert!(config.rotate_keys);
        assert_eq!(config.max_deferrals, ClientConfig::default().max_deferrals);
    }
}
