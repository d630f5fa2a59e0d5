//! Error types for the drawing pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the drawing pipeline.
///
/// Element- and group-level failures (a single projection, a single
/// material union) are absorbed and counted instead.
#[derive(Error, Debug)]
pub enum DrawError {
    /// Model layer error.
    #[error(transparent)]
    Ir(#[from] bimdraw_ir::IrError),

    /// Camera or engine settings rejected by the projection engine.
    #[error(transparent)]
    Projection(#[from] bimdraw_hlr::ProjectionError),

    /// A layer document could not be parsed or written.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A layer document parsed but is not a usable SVG.
    #[error("malformed layer document {path}: {reason}")]
    Layer {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The geometry cache could not be persisted.
    #[error("cache error: {0}")]
    Cache(String),

    /// Configuration file is invalid.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// No usable output path was supplied.
    #[error("invalid output path: {0}")]
    OutputPath(PathBuf),

    /// The worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, DrawError>;
