//! Per-invocation deferred-call list.
//!
//! A [`DeferFrame`] belongs to one execution of an enclosing routine. Calls
//! registered on it run last-registered-first when the frame is unwound,
//! either explicitly through [`DeferFrame::unwind`] or implicitly when the
//! frame is dropped (early return, panic).

use std::panic;
use std::thread;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::call::{self, CallOutcome, DeferredCall, PanicPayload};
use crate::config::FrameConfig;
use crate::error::{BoxError, DeferError};

/// Summary of a frame after all of its deferred calls have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Name of the routine the frame belonged to.
    pub name: String,
    /// Unique id of the invocation.
    pub invocation_id: Uuid,
    /// Registration orders in the order the calls executed.
    pub executed: Vec<usize>,
}

impl FrameReport {
    /// Number of deferred calls that ran.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }
}

/// Result of draining the pending list.
#[derive(Default)]
struct Drained {
    executed: Vec<usize>,
    failure: Option<DeferError>,
    panic: Option<PanicPayload>,
}

/// The deferred calls owned by one invocation of a routine.
#[derive(Debug)]
pub struct DeferFrame<'a> {
    name: String,
    invocation_id: Uuid,
    /// Pending calls in registration order; popped from the back.
    calls: Vec<DeferredCall<'a>>,
    next_order: usize,
}

impl<'a> DeferFrame<'a> {
    /// Create an empty frame for the routine `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(FrameConfig::new(name))
    }

    /// Create an empty frame from a [`FrameConfig`].
    #[must_use]
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            name: config.name,
            invocation_id: Uuid::new_v4(),
            calls: Vec::with_capacity(config.capacity),
            next_order: 0,
        }
    }

    /// Returns the routine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique id of this invocation.
    #[must_use]
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Number of calls still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns `true` if no calls are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Labels of the pending calls, in the order they will run.
    #[must_use]
    pub fn pending_labels(&self) -> Vec<Option<&str>> {
        self.calls.iter().rev().map(DeferredCall::label).collect()
    }

    /// Schedule `f` to run when this frame unwinds.
    ///
    /// Nothing observable happens now. Returns the registration order.
    pub fn defer<F>(&mut self, f: F) -> usize
    where
        F: FnOnce() + 'a,
    {
        self.push(
            None,
            Box::new(move || {
                f();
                Ok(())
            }),
        )
    }

    /// Same as [`defer`](Self::defer), with a label used in logs and errors.
    pub fn defer_labeled<F>(&mut self, label: impl Into<String>, f: F) -> usize
    where
        F: FnOnce() + 'a,
    {
        self.push(
            Some(label.into()),
            Box::new(move || {
                f();
                Ok(())
            }),
        )
    }

    /// Schedule a call that may fail.
    ///
    /// A failure does not stop the remaining calls. The first failure is
    /// returned from [`unwind`](Self::unwind) as [`DeferError::CallFailed`];
    /// any further ones are logged.
    pub fn defer_fallible<F, E>(&mut self, f: F) -> usize
    where
        F: FnOnce() -> Result<(), E> + 'a,
        E: Into<BoxError>,
    {
        self.push(
            None,
            Box::new(move || -> Result<(), BoxError> { f().map_err(Into::into) }),
        )
    }

    fn push(&mut self, label: Option<String>, callable: call::Callable<'a>) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        debug!(
            frame = %self.name,
            invocation_id = %self.invocation_id,
            order,
            label = label.as_deref().unwrap_or(""),
            "registered deferred call"
        );
        self.calls.push(DeferredCall::new(order, label, callable));
        order
    }

    /// Run every pending call, last registered first, and consume the frame.
    ///
    /// If a call panicked, the remaining calls still run and the most recent
    /// panic is then resumed.
    ///
    /// # Errors
    ///
    /// Returns [`DeferError::CallFailed`] for the first fallible call that
    /// returned an error.
    pub fn unwind(mut self) -> Result<FrameReport, DeferError> {
        let drained = self.run_pending();
        if let Some(payload) = drained.panic {
            panic::resume_unwind(payload);
        }
        if let Some(err) = drained.failure {
            return Err(err);
        }
        Ok(FrameReport {
            name: std::mem::take(&mut self.name),
            invocation_id: self.invocation_id,
            executed: drained.executed,
        })
    }

    fn run_pending(&mut self) -> Drained {
        let mut drained = Drained::default();
        while let Some(pending) = self.calls.pop() {
            let order = pending.order();
            let label = pending.label().map(str::to_owned);
            debug!(
                frame = %self.name,
                invocation_id = %self.invocation_id,
                order,
                "running deferred call"
            );
            match pending.run() {
                CallOutcome::Completed => {}
                CallOutcome::Failed(source) => {
                    let err = DeferError::CallFailed {
                        frame: self.name.clone(),
                        order,
                        label,
                        source,
                    };
                    if drained.failure.is_none() {
                        drained.failure = Some(err);
                    } else {
                        warn!(
                            invocation_id = %self.invocation_id,
                            error = %err,
                            "further deferred call failed"
                        );
                    }
                }
                CallOutcome::Panicked(payload) => {
                    if let Some(prev) = drained.panic.replace(payload) {
                        warn!(
                            invocation_id = %self.invocation_id,
                            panic = call::panic_message(&prev),
                            "deferred call panic superseded by a later one"
                        );
                    }
                }
            }
            drained.executed.push(order);
        }
        drained
    }
}

impl Drop for DeferFrame<'_> {
    fn drop(&mut self) {
        if self.calls.is_empty() {
            return;
        }
        let drained = self.run_pending();
        if let Some(err) = drained.failure {
            warn!(
                invocation_id = %self.invocation_id,
                error = %err,
                "deferred call failed on scope exit"
            );
        }
        if let Some(payload) = drained.panic {
            if thread::panicking() {
                error!(
                    frame = %self.name,
                    invocation_id = %self.invocation_id,
                    panic = call::panic_message(&payload),
                    "deferred call panicked while unwinding"
                );
            } else {
                panic::resume_unwind(payload);
            }
        }
    }
}
