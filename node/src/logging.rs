//! # Structured Logging
//!
//! Installs the `tracing` subscriber: `RUST_LOG` filtering, pretty or JSON
//! lines on stderr. Stdout is kept for the demo's JSON summary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormatArg;

/// Install the global subscriber. Call once, early in `main()`.
///
/// `default_level` applies when `RUST_LOG` is unset, e.g.
/// `"zether_node=info,zether_protocol=info"`.
pub fn init_logging(default_level: &str, format: LogFormatArg) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormatArg::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormatArg::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!(?format, "logging initialized");
}
