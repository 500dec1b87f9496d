//! Classical Library - headless front end for the classical media library.
//!
//! Mirrors a media catalog into a local SQLite library of albums, pieces,
//! movements, songs and playlists, and lets you inspect the result.

use clap::Parser;
use classical_library::cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Subsystem log targets shown at info level unless `RUST_LOG` says otherwise.
const LOG_TARGETS: [&str; 6] = ["classical_library", "sync", "detector", "parser", "db", "source"];

fn log_filter() -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{}=info", target).parse()?);
    }
    Ok(filter)
}

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter()?)
        .init();

    cli::run_command(&args)
}
