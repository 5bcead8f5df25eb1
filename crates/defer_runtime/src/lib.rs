//! # defer_runtime
//!
//! Deferred-call runner: schedule zero-argument closures to run when the
//! enclosing routine returns.
//!
//! This crate provides:
//!
//! - [`DeferFrame`] — the per-invocation list of deferred calls. Calls run
//!   last-registered-first, exactly once, on every exit path.
//! - [`invoke`] / [`invoke_with`] — run a routine body inside its own frame.
//! - [`FrameConfig`] — frame name and capacity.
//! - [`DeferError`] — failures reported by fallible deferred calls.
//!
//! ## Usage
//!
//! ```rust
//! use std::cell::RefCell;
//!
//! use defer_runtime::{DeferError, invoke};
//!
//! let log = RefCell::new(Vec::new());
//! let result: Result<(), DeferError> = invoke("main", |frame| {
//!     log.borrow_mut().push("main started");
//!     frame.defer(|| log.borrow_mut().push("I am done"));
//!     log.borrow_mut().push("main finished");
//!     Ok(())
//! });
//!
//! assert!(result.is_ok());
//! assert_eq!(*log.borrow(), ["main started", "main finished", "I am done"]);
//! ```

pub mod call;
pub mod config;
pub mod error;
pub mod frame;
pub mod invoke;

pub use call::{CallOutcome, DeferredCall, PanicPayload, panic_message};
pub use config::FrameConfig;
pub use error::{BoxError, DeferError};
pub use frame::{DeferFrame, FrameReport};
pub use invoke::{invoke, invoke_with};
