// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Zether Demo
//!
//! Entry point for the `zether-demo` binary. Spins up an in-memory ledger,
//! registers four wallets and walks through a deposit, an anonymous
//! transfer and a withdrawal, printing a JSON summary on stdout.
//!
//! Subcommands:
//!
//! - `run`      — the full walkthrough
//! - `estimate` — proving-time estimate for an anonymity-set size
//! - `version`  — print build version information

mod cli;
mod logging;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use zether_protocol::account::{
    check_capacity, estimate_proving_millis, AnonymitySet, Clock, SystemClock,
};
use zether_protocol::client::Client;
use zether_protocol::config::ClientConfig;
use zether_protocol::crypto::keys::Address;
use zether_protocol::ledger::{InMemoryLedger, LedgerParameters};

use cli::{Commands, DemoCli};

const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

#[derive(Serialize)]
struct RunSummary {
    parameters: LedgerParameters,
    rotate_keys: bool,
    transfer_tx: String,
    transfer_epoch: u64,
    withdraw_tx: String,
    withdraw_epoch: u64,
    balances: BTreeMap<&'static str, u64>,
}

#[derive(Serialize)]
struct EstimateSummary {
    size: usize,
    estimate_ms: u64,
    with_ledger_ms: u64,
    epoch_length: u64,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DemoCli::parse();
    logging::init_logging("zether_node=info,zether_protocol=info", cli.log_format);

    match cli.command {
        Commands::Run(args) => run_demo(args).await,
        Commands::Estimate(args) => estimate(args),
        Commands::Version => {
            println!("zether-demo {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn open_wallet(
    ledger: &Arc<InMemoryLedger>,
    clock: &Arc<dyn Clock>,
    config: &ClientConfig,
    seed: u64,
    name: &str,
) -> Result<Client<InMemoryLedger>> {
    let mut client = Client::connect(
        Arc::clone(ledger),
        Arc::clone(clock),
        config.clone(),
        StdRng::seed_from_u64(seed),
    );
    client
        .register()
        .await
        .with_context(|| format!("failed to register {name}"))?;
    Ok(client)
}

async fn run_demo(args: cli::RunArgs) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let parameters = LedgerParameters {
        epoch_length: args.epoch_length,
        fee: args.fee,
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = Arc::new(InMemoryLedger::new(
        Address::random(&mut rng),
        parameters,
        Arc::clone(&clock),
    ));
    let config = ClientConfig {
        rotate_keys: args.rotate_keys,
        ..ClientConfig::default()
    };
    tracing::info!(
        epoch_length = args.epoch_length,
        fee = args.fee,
        rotate_keys = args.rotate_keys,
        "starting demo"
    );

    let mut wallets = Vec::with_capacity(NAMES.len());
    for (i, name) in NAMES.iter().enumerate() {
        let seed = args.seed.wrapping_add(1 + i as u64);
        wallets.push(open_wallet(&ledger, &clock, &config, seed, name).await?);
    }
    let keys = wallets
        .iter()
        .map(Client::public_key)
        .collect::<Option<Vec<_>>>()
        .context("wallet registered without a key")?;
    for wallet in wallets.iter_mut() {
        for (name, key) in NAMES.iter().zip(&keys) {
            if wallet.public_key() != Some(*key) {
                wallet.friends_mut().add(*name, *key);
            }
        }
    }

    let (alice, others) = wallets
        .split_first_mut()
        .context("no wallets were opened")?;
    alice
        .deposit(args.deposit)
        .await
        .context("deposit failed")?;
    let transfer = alice
        .transfer("bob", args.amount, &["carol", "dave"], Some("carol"))
        .await
        .context("transfer failed")?;
    for wallet in others.iter_mut() {
        wallet.sync();
    }
    let withdrawal = alice
        .withdraw(args.withdraw)
        .await
        .context("withdrawal failed")?;
    for wallet in others.iter_mut() {
        wallet.sync();
    }

    let balances = NAMES
        .iter()
        .zip(&wallets)
        .map(|(name, wallet)| (*name, wallet.balance()))
        .collect();
    let summary = RunSummary {
        parameters,
        rotate_keys: args.rotate_keys,
        transfer_tx: transfer.tx_id.to_string(),
        transfer_epoch: transfer.epoch,
        withdraw_tx: withdrawal.tx_id.to_string(),
        withdraw_epoch: withdrawal.epoch,
        balances,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn estimate(args: cli::EstimateArgs) -> Result<()> {
    let error = AnonymitySet::validate_size(args.size)
        .and_then(|()| check_capacity(args.size, args.epoch_length))
        .err()
        .map(|e| e.to_string());
    let summary = EstimateSummary {
        size: args.size,
        estimate_ms: estimate_proving_millis(args.size, false),
        with_ledger_ms: estimate_proving_millis(args.size, true),
        epoch_length: args.epoch_length,
        error,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
