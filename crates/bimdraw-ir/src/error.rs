//! Error types for the model layer.

use thiserror::Error;

use crate::Guid;

/// Errors raised while building or loading a model.
#[derive(Error, Debug)]
pub enum IrError {
    /// A drawing scale string did not follow `<label>|<num>/<den>`.
    #[error("invalid drawing scale: {0}")]
    InvalidScale(String),

    /// Two elements share one GUID.
    #[error("duplicate element guid: {0}")]
    DuplicateGuid(Guid),

    /// Model file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model file is not valid JSON for this schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, IrError>;
