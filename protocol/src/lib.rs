// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Zether Protocol — Core Library
//!
//! Anonymous confidential transfers over alt_bn128. Balances live on a
//! ledger as ElGamal ciphertexts; a transfer moves value between two
//! accounts hidden in a larger anonymity set and proves, without revealing
//! who paid whom or how much, that nobody's balance went negative.
//!
//! ## Architecture
//!
//! - **config** — Protocol constants and client settings.
//! - **crypto** — Curve types, hashing, keys, ElGamal, vector helpers.
//! - **zkp** — Commitments, inner-product argument, transfer and burn proofs.
//! - **account** — Epoch roll-over, spend scheduling, anonymity sets.
//! - **ledger** — The ledger interface and an in-memory implementation.
//! - **client** — Wallet orchestration: register, deposit, transfer,
//!   withdraw, event processing.
//!
//! ## Design Philosophy
//!
//! 1. Proof bytes are a wire contract. Generators, transcript order and
//!    serialization never change silently.
//! 2. Secrets stay in witnesses and keypairs, and neither prints them.
//! 3. Waiting for an epoch is a schedule, not an error.

pub mod account;
pub mod client;
pub mod config;
pub mod crypto;
pub mod ledger;
pub mod zkp;
