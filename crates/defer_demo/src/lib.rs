//! # defer_demo
//!
//! The classic deferred-call walkthrough: print a start message, schedule a
//! cleanup call, print a finish message. The cleanup call's output comes
//! last because it runs as the `main` routine returns.

use std::cell::RefCell;
use std::io::Write;

use anyhow::{Context, Result};
use defer_runtime::invoke;

/// Printed first.
pub const MAIN_STARTED: &str = "main started";
/// Printed second, after the cleanup call is registered.
pub const MAIN_FINISHED: &str = "main finished";
/// Printed by the deferred cleanup call.
pub const DONE: &str = "I am done";

/// The deferred cleanup call.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn say_done<W: Write>(out: &RefCell<W>) -> Result<()> {
    writeln!(out.borrow_mut(), "{DONE}").context("failed to write done message")
}

/// Run the `main` routine against `out`.
///
/// # Errors
///
/// Returns an error if any console write fails, including the deferred one.
pub fn run_main<W: Write>(out: &RefCell<W>) -> Result<()> {
    invoke("main", |frame| {
        writeln!(out.borrow_mut(), "{MAIN_STARTED}").context("failed to write start message")?;

        frame.defer_fallible(|| say_done(out));

        writeln!(out.borrow_mut(), "{MAIN_FINISHED}").context("failed to write finish message")?;
        Ok(())
    })
}
