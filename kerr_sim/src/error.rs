//! Harness error type.

use kerr_core::KerrError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Kerr(#[from] KerrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
