//! Error types for the tracing-engine boundary.

use thiserror::Error;

/// Errors raised by a tracing engine or by the raw batches it returns.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The batch arrays do not match the declared shape
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A raw status code outside {0, 1, 2}
    #[error("Unknown ray status code: {0}")]
    UnknownStatusCode(u8),

    /// `trace` was called before `rebuild`
    #[error("Engine has not been built for camera {0}")]
    NotBuilt(String),

    /// Integration failure reported by the engine itself
    #[error("Trace failed: {0}")]
    Trace(String),
}

impl EngineError {
    /// Creates a shape mismatch error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Creates a trace failure.
    pub fn trace(msg: impl Into<String>) -> Self {
        Self::Trace(msg.into())
    }
}
