//! Prints `main started`, `main finished`, then the deferred `I am done`.
//!
//! Diagnostics go to stderr and are filtered through `RUST_LOG`
//! (default `warn`), so stdout carries only the three lines.

use std::cell::RefCell;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "defer_demo",
    version,
    about = "Demonstrates a call deferred until the enclosing routine returns"
)]
struct Args {}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let _args = Args::parse();

    let out = RefCell::new(io::stdout().lock());
    defer_demo::run_main(&out)?;
    out.into_inner().flush().context("failed to flush stdout")?;

    debug!("main routine returned");
    Ok(())
}
