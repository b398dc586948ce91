//! # CLI Interface
//!
//! Command-line arguments for `zether-demo`, via `clap` derive. Every flag
//! has an environment fallback so the demo can be driven from CI.

use clap::{Parser, Subcommand, ValueEnum};

/// Drive the Zether protocol against an in-memory ledger.
#[derive(Parser, Debug)]
#[command(
    name = "zether-demo",
    about = "Anonymous confidential transfers against an in-memory ledger",
    version,
    propagate_version = true
)]
pub struct DemoCli {
    /// Log output format.
    #[arg(long, value_enum, env = "ZETHER_LOG_FORMAT", default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register four accounts, deposit, transfer anonymously and withdraw.
    Run(RunArgs),
    /// Print the proving-time estimate for an anonymity-set size and check
    /// it against an epoch length.
    Estimate(EstimateArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Seconds per epoch.
    #[arg(long, env = "ZETHER_EPOCH_LENGTH", default_value_t = 8)]
    pub epoch_length: u64,

    /// Fee charged per transfer.
    #[arg(long, env = "ZETHER_FEE", default_value_t = 1)]
    pub fee: u64,

    /// Amount the sender deposits.
    #[arg(long, default_value_t = 100)]
    pub deposit: u64,

    /// Amount transferred.
    #[arg(long, default_value_t = 10)]
    pub amount: u64,

    /// Amount withdrawn by the sender after the transfer.
    #[arg(long, default_value_t = 20)]
    pub withdraw: u64,

    /// Rotate every party's key on each transfer.
    #[arg(long, env = "ZETHER_ROTATE_KEYS")]
    pub rotate_keys: bool,

    /// Seed for reproducible key material.
    #[arg(long, env = "ZETHER_SEED", default_value_t = 42)]
    pub seed: u64,
}

#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Anonymity-set size, including sender and receiver.
    #[arg(long)]
    pub size: usize,

    /// Epoch length in seconds to check against.
    #[arg(long, default_value_t = 6)]
    pub epoch_length: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}
