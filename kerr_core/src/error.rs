//! Error types for the Kerr camera core.

use kerr_env::EngineError;
use thiserror::Error;

/// Errors raised by camera construction, metric evaluation and congruence
/// queries.
#[derive(Debug, Error)]
pub enum KerrError {
    /// Invalid camera, sensor or grid parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Row, column or time index outside the grid
    #[error("Index out of range: {what} = {index}, valid range is 0..{len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Metric quantities would be non-real or undefined at this position
    #[error("Invalid geometry at r={r}, theta={theta}: {reason}")]
    InvalidGeometry { r: f64, theta: f64, reason: String },

    /// Arrays whose lengths disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Failure reported by, or in the output of, a tracing engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Raster encoding or file I/O failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl KerrError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }

    /// Creates an invalid-geometry error.
    pub fn geometry(r: f64, theta: f64, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            r,
            theta,
            reason: reason.into(),
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, KerrError>;
