//! Error types for the projection engine.

use thiserror::Error;

/// Errors that can occur while projecting geometry.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Camera vectors are zero or parallel, or the view has no extent.
    #[error("degenerate camera: {0}")]
    DegenerateCamera(String),

    /// Mesh indices or positions are unusable.
    #[error("mesh has degenerate geometry: {0}")]
    DegenerateMesh(String),

    /// Invalid engine settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
