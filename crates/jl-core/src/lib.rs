//! Shared primitives used across justlazy crates.

mod host;

pub use host::DocumentHost;
pub use host::EventKind;
pub use host::EventListener;
pub use host::ListenerId;
pub use host::LoadHandler;
pub use host::WindowHost;

/// Result alias used across the workspace.
pub type LazyResult<T> = Result<T, LazyError>;

/// Top-level error type. `code` is a stable dotted identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct LazyError {
    pub code: &'static str,
    pub message: String,
}

impl LazyError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
