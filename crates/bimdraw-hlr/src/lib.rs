#![warn(missing_docs)]

//! Orthographic hidden-line projection for building drawings.
//!
//! This crate turns element geometry into paper-space linework for one
//! orthographic camera:
//!
//! - **View frame**: camera basis, cut plane, and the model-to-paper mapping
//! - **Edge extraction**: sharp, silhouette, and boundary edges of a mesh
//! - **Hidden line removal**: ray-cast visibility of edge samples
//! - **Section cutting**: plane-mesh intersection chained into closed rings
//!
//! # Example
//!
//! ```
//! use bimdraw_hlr::{HlrEngine, PathKind, ProjectionEngine, ViewFrame};
//! use bimdraw_ir::{Camera, Geometry, TriangleMesh};
//!
//! let frame = ViewFrame::new(&Camera::plan([0.0, 0.0, 1.0], 10.0, 10.0), 10.0).unwrap();
//! let wall = TriangleMesh::cuboid([0.0, 0.0, 0.0], [4.0, 0.2, 3.0]);
//! let paths = HlrEngine::default().project(&Geometry::Mesh(wall), &frame).unwrap();
//!
//! assert!(paths.iter().any(|p| p.kind == PathKind::Cut && p.closed));
//! ```

pub mod edge_extract;
pub mod engine;
pub mod error;
pub mod hidden_line;
pub mod projection;
pub mod section;
pub mod types;

pub use edge_extract::{extract_edges, mesh_triangles, DEFAULT_SHARP_ANGLE};
pub use engine::{HlrEngine, HlrSettings, ProjectionEngine};
pub use error::{ProjectionError, Result};
pub use hidden_line::{point_visibility, ray_hits_triangle, visible_runs, SectionCaps};
pub use projection::{clip_to_front, ViewFrame};
pub use section::{chain_segments, intersect_mesh_with_plane, point_in_polygon};
pub use types::{
    BoundingBox2D, EdgeType, MeshEdge, PathKind, Point2D, Point3, ProjectedPath, Triangle3D, Vec3,
    Visibility,
};
