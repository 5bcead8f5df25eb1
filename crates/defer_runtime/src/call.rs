//! A single deferred-call registration.
//!
//! A [`DeferredCall`] is consumed when it runs, so a registration can
//! execute at most once.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::error::BoxError;

/// Boxed zero-argument callable held by a registration.
pub(crate) type Callable<'a> = Box<dyn FnOnce() -> Result<(), BoxError> + 'a>;

/// Payload carried by a panic caught while running a deferred call.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// What happened when a deferred call ran.
#[derive(Debug)]
pub enum CallOutcome {
    /// The call returned normally.
    Completed,
    /// A fallible call returned an error.
    Failed(BoxError),
    /// The call panicked.
    Panicked(PanicPayload),
}

impl CallOutcome {
    /// Returns `true` if the call returned normally.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One pending registration: the callable plus its registration order.
pub struct DeferredCall<'a> {
    order: usize,
    label: Option<String>,
    callable: Callable<'a>,
}

impl<'a> DeferredCall<'a> {
    pub(crate) fn new(order: usize, label: Option<String>, callable: Callable<'a>) -> Self {
        Self {
            order,
            label,
            callable,
        }
    }

    /// Registration order within the owning frame (0-based).
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Label given at registration.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Run the call. Panics are caught and reported in the outcome.
    pub fn run(self) -> CallOutcome {
        match panic::catch_unwind(AssertUnwindSafe(self.callable)) {
            Ok(Ok(())) => CallOutcome::Completed,
            Ok(Err(err)) => CallOutcome::Failed(err),
            Err(payload) => CallOutcome::Panicked(payload),
        }
    }
}

impl fmt::Debug for DeferredCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCall")
            .field("order", &self.order)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Best-effort text of a panic payload.
#[must_use]
pub fn panic_message(payload: &PanicPayload) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
