#![warn(missing_docs)]

//! Drawing generation for building-information models.
//!
//! Turns an orthographic camera view of a [`ModelQuery`] into a layered SVG
//! drawing:
//!
//! - **Context resolution** ([`resolve_contexts`]): which representation
//!   contexts apply to the drawing's target view, in priority order
//! - **Linework extraction** ([`extract_linework`]): hidden-line projection
//!   per element, reusing cached projections from a [`GeometryStore`]
//! - **Polygon merging** ([`merge_linework`]): same-material cut rings
//!   unioned into single outlines, with small holes purged
//! - **Composition** ([`svg::compose`]): underlay, linework, and annotation
//!   layers combined into one document
//!
//! [`generate_drawing`] runs the whole pipeline for one drawing.
//!
//! [`ModelQuery`]: bimdraw_ir::ModelQuery

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod pipeline;
pub mod resolve;
pub mod svg;

pub use cache::{fingerprint, CacheEntry, FileStore, GeometryStore, MemoryStore};
pub use config::{MergeSettings, PipelineConfig};
pub use error::{DrawError, Result};
pub use extract::{extract_linework, ExtractOptions, ExtractionReport, Linework, VectorFragment};
pub use merge::{merge_linework, min_hole_area, MergeReport};
pub use pipeline::{generate_drawing, generate_drawings, DrawingReport, DrawingRequest};
pub use resolve::{resolve_contexts, ContextPlan};
