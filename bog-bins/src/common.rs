//! Common CLI and logging setup shared by the dual-grid binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// CLI arguments for `bog-dual-grid`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Configuration profile: development, staging, or production.
    #[arg(short, long, default_value = "development")]
    pub profile: String,

    /// Overrides the profile's default trading symbol.
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Log level, forwarded to `RUST_LOG` if that's unset.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initializes the `tracing` subscriber: `RUST_LOG` wins if set, otherwise
/// falls back to `--log-level`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    Ok(())
}
