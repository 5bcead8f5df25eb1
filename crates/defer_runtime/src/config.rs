//! Frame configuration.

/// Configuration for a single enclosing-routine invocation.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Human-readable routine name (e.g. `"main"`), used in logs and errors.
    pub name: String,
    /// Number of registrations to reserve space for up front.
    pub capacity: usize,
}

impl FrameConfig {
    /// Create a new frame config with the given routine name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 0,
        }
    }

    /// Reserve space for `capacity` deferred calls.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new("anonymous")
    }
}
