//! layerfs entry point.
//!
//! ```bash
//! layerfs --layer ./overrides --layer ./defaults cat views/home.html
//! layerfs --config layers.toml --overlay ls views
//! RUST_LOG=layerfs=trace layerfs -l a -l b stat index.html
//! ```

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use layerfs_cli::{Cli, build_fs, execute};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean (respects RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let fs = build_fs(&cli).await?;
    let output = execute(&fs, &cli.command).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&output)
        .context("Failed to write output")?;
    stdout.flush().context("Failed to flush output")?;
    Ok(())
}
