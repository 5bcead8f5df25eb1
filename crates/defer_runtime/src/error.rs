//! Deferred-call error types.

/// Error type a fallible deferred call is boxed into.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced when a frame runs its deferred calls.
#[derive(Debug, thiserror::Error)]
pub enum DeferError {
    /// A fallible deferred call returned an error.
    #[error("deferred call {order} in `{frame}` failed: {source}")]
    CallFailed {
        /// Name of the routine that registered the call.
        frame: String,
        /// Registration order of the failing call within its frame.
        order: usize,
        /// Label given at registration, if any.
        label: Option<String>,
        /// The error the call returned.
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_call_failed_display_and_source() {
        let err = DeferError::CallFailed {
            frame: "main".to_string(),
            order: 2,
            label: Some("flush".to_string()),
            source: "disk full".into(),
        };
        assert_eq!(err.to_string(), "deferred call 2 in `main` failed: disk full");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("disk full")
        );
    }
}
