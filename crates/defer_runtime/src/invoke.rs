//! Running a routine body inside its own deferred-call frame.

use tracing::{debug, warn};

use crate::config::FrameConfig;
use crate::error::DeferError;
use crate::frame::DeferFrame;

/// Run `body` with a fresh [`DeferFrame`] named `name`.
///
/// See [`invoke_with`].
///
/// # Errors
///
/// Returns the body's error, or a [`DeferError`] converted into `E` if the
/// body succeeded but a fallible deferred call failed.
pub fn invoke<'a, T, E, F>(name: impl Into<String>, body: F) -> Result<T, E>
where
    F: FnOnce(&mut DeferFrame<'a>) -> Result<T, E>,
    E: From<DeferError>,
{
    invoke_with(FrameConfig::new(name), body)
}

/// Run `body` with a fresh [`DeferFrame`] built from `config`.
///
/// Whether the body returns `Ok`, returns `Err` early, or panics, every call
/// it registered runs last-registered-first before control comes back here.
/// A body panic keeps propagating after the deferred calls have run.
///
/// # Errors
///
/// Returns the body's error if it failed. Otherwise returns the first
/// deferred-call failure, if any.
pub fn invoke_with<'a, T, E, F>(config: FrameConfig, body: F) -> Result<T, E>
where
    F: FnOnce(&mut DeferFrame<'a>) -> Result<T, E>,
    E: From<DeferError>,
{
    let mut frame = DeferFrame::with_config(config);
    let result = body(&mut frame);
    let pending = frame.len();
    let unwound = frame.unwind();

    match (result, unwound) {
        (Ok(value), Ok(report)) => {
            debug!(
                frame = %report.name,
                invocation_id = %report.invocation_id,
                executed = report.executed_count(),
                "routine returned"
            );
            Ok(value)
        }
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(_)) => {
            debug!(pending, "routine exited early");
            Err(err)
        }
        (Err(err), Err(defer_err)) => {
            warn!(error = %defer_err, "deferred call failed after routine error");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{self, AssertUnwindSafe};

    use anyhow::{Context, bail};

    use super::*;
    use crate::call::panic_message;

    #[test]
    fn test_deferred_call_runs_after_body() {
        let log = RefCell::new(Vec::new());
        let result: Result<(), DeferError> = invoke("main", |frame| {
            log.borrow_mut().push("main started");
            frame.defer(|| log.borrow_mut().push("I am done"));
            log.borrow_mut().push("main finished");
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(*log.borrow(), vec!["main started", "main finished", "I am done"]);
    }

    #[test]
    fn test_body_value_is_returned() {
        let cleaned = Cell::new(false);
        let value: Result<u32, DeferError> = invoke("compute", |frame| {
            frame.defer(|| cleaned.set(true));
            Ok(42)
        });
        assert_eq!(value.unwrap(), 42);
        assert!(cleaned.get());
    }

    #[test]
    fn test_early_exit_runs_deferred_calls() {
        fn parse(input: &str, log: &RefCell<Vec<String>>) -> anyhow::Result<u32> {
            invoke("parse", |frame| {
                frame.defer(|| log.borrow_mut().push("closed".to_string()));
                let n = input.trim().parse::<u32>().context("not a number")?;
                log.borrow_mut().push(format!("parsed {n}"));
                Ok(n)
            })
        }

        let log = RefCell::new(Vec::new());
        assert!(parse("abc", &log).is_err());
        assert_eq!(*log.borrow(), vec!["closed"]);

        log.borrow_mut().clear();
        assert_eq!(parse(" 7 ", &log).unwrap(), 7);
        assert_eq!(*log.borrow(), vec!["parsed 7", "closed"]);
    }

    #[test]
    fn test_deferred_failure_surfaces_when_body_succeeds() {
        let result: anyhow::Result<()> = invoke("main", |frame| {
            frame.defer_fallible(|| Err::<(), _>(std::io::Error::other("flush failed")));
            Ok(())
        });
        let err = result.unwrap_err();
        let defer_err = err.downcast_ref::<DeferError>().unwrap();
        let DeferError::CallFailed { frame, order, .. } = defer_err;
        assert_eq!(frame, "main");
        assert_eq!(*order, 0);
    }

    #[test]
    fn test_body_error_takes_precedence() {
        let result: anyhow::Result<()> = invoke("main", |frame| {
            frame.defer_fallible(|| Err::<(), _>("cleanup failed"));
            bail!("body failed")
        });
        assert_eq!(result.unwrap_err().to_string(), "body failed");
    }

    #[test]
    fn test_body_panic_runs_deferred_calls() {
        let log = RefCell::new(Vec::new());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), DeferError> = invoke("main", |frame| {
                frame.defer(|| log.borrow_mut().push("first"));
                frame.defer(|| log.borrow_mut().push("second"));
                panic!("body panic");
            });
        }));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(&payload), "body panic");
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn test_deferred_panic_during_body_panic_keeps_original() {
        let ran = Cell::new(false);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), DeferError> = invoke("main", |frame| {
                frame.defer(|| ran.set(true));
                frame.defer(|| panic!("cleanup panic"));
                panic!("body panic");
            });
        }));
        let payload = result.unwrap_err();
        assert_eq!(panic_message(&payload), "body panic");
        assert!(ran.get());
    }

    #[test]
    fn test_invoke_with_config() {
        let order = RefCell::new(Vec::new());
        let result: Result<(), DeferError> =
            invoke_with(FrameConfig::new("batch").with_capacity(3), |frame| {
                for i in 0..3 {
                    let order = &order;
                    frame.defer(move || order.borrow_mut().push(i));
                }
                assert_eq!(frame.name(), "batch");
                assert_eq!(frame.len(), 3);
                Ok(())
            });
        assert!(result.is_ok());
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }
}
