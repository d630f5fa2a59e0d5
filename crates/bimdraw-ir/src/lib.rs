#![warn(missing_docs)]

//! Building model types for the bimdraw drawing pipeline.
//!
//! This crate defines the read-only view of a building-information model that
//! the drawing pipeline consumes: representation contexts, elements with
//! their per-context geometry, materials, annotations, and the drawing
//! (camera, target view, scale, style) being generated.
//!
//! Model editing and synchronisation happen elsewhere. The pipeline only ever
//! sees a [`ModelQuery`] implementation plus a set of invalidated GUIDs.

pub mod context;
pub mod drawing;
pub mod element;
pub mod error;
pub mod model;
pub mod units;

pub use context::{ContextId, ContextIdentifier, ContextType, RepresentationContext};
pub use drawing::{Camera, Drawing, DrawingScale, DrawingStyle, RenderType, TargetView};
pub use element::{
    Annotation, AnnotationKind, Element, Geometry, Guid, Material, Polyline3, Representation,
    TriangleMesh,
};
pub use error::{IrError, Result};
pub use model::{InMemoryModel, ModelQuery};
pub use units::{LengthUnit, SiPrefix};

/// Property set attached to drawing cameras.
pub const DRAWING_PSET: &str = "EPset_Drawing";
