//! Core types for projected drawing geometry.

use serde::{Deserialize, Serialize};

/// A point in 3D model space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D model space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A 2D point in paper millimetres.
///
/// We use a custom type instead of nalgebra::Point2 so cache entries
/// serialize without nalgebra's serde feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate, growing right.
    pub x: f64,
    /// Y coordinate, growing down (SVG convention).
    pub y: f64,
}

impl Point2D {
    /// Point at `(x, y)`.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Sheet origin, top left.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Euclidean distance in millimetres.
    pub fn distance(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// Whether a sample on an edge can be seen from the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Nothing lies between the sample and the camera.
    Visible,
    /// A face or a section cap covers the sample.
    Hidden,
}

/// Classification of edge type based on geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    /// Crease between two faces steeper than the sharp angle.
    Sharp,
    /// Outline where a front face meets a back face.
    Silhouette,
    /// Open edge with a single face, e.g. on a sheet element.
    Boundary,
}

/// A mesh edge in 3D space (before projection).
#[derive(Debug, Clone)]
pub struct MeshEdge {
    /// Lower vertex index.
    pub v0: u32,
    /// Higher vertex index.
    pub v1: u32,
    /// Triangle the edge was first seen on.
    pub tri0: u32,
    /// Neighbouring triangle, if any.
    pub tri1: Option<u32>,
    /// Why an edge is drawn.
    pub edge_type: EdgeType,
}

impl MeshEdge {
    /// Edge between two vertex indices.
    pub fn new(v0: u32, v1: u32, tri0: u32, tri1: Option<u32>, edge_type: EdgeType) -> Self {
        let (v0, v1) = if v0 < v1 { (v0, v1) } else { (v1, v0) };
        Self {
            v0,
            v1,
            tri0,
            tri1,
            edge_type,
        }
    }

    /// True for open edges.
    pub fn is_boundary(&self) -> bool {
        self.tri1.is_none()
    }

    /// Whether `tri` is one of the faces sharing this edge.
    pub fn touches(&self, tri: u32) -> bool {
        self.tri0 == tri || self.tri1 == Some(tri)
    }
}

/// 2D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox2D {
    /// Left.
    pub min_x: f64,
    /// Top.
    pub min_y: f64,
    /// Right.
    pub max_x: f64,
    /// Bottom.
    pub max_y: f64,
}

impl BoundingBox2D {
    /// Inverted box that any point will grow.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Grow to cover `p`.
    pub fn include_point(&mut self, p: Point2D) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// False until a point has been included.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Whether two boxes overlap (touching counts).
    pub fn intersects(&self, other: &Self) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

impl Default for BoundingBox2D {
    fn default() -> Self {
        Self::empty()
    }
}

/// A 3D triangle from the mesh, used for occlusion testing.
#[derive(Debug, Clone, Copy)]
pub struct Triangle3D {
    /// First vertex.
    pub v0: Point3,
    /// Second vertex.
    pub v1: Point3,
    /// Third vertex.
    pub v2: Point3,
    /// Face normal (pointing outward). Zero for degenerate triangles.
    pub normal: Vec3,
}

impl Triangle3D {
    /// Triangle with its unit normal; degenerate triangles get a zero normal.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let normal = e1.cross(&e2).try_normalize(1e-12).unwrap_or_else(Vec3::zeros);
        Self { v0, v1, v2, normal }
    }

    /// Check if the triangle faces a viewer looking along `view_dir`.
    pub fn is_front_facing(&self, view_dir: &Vec3) -> bool {
        self.normal.dot(view_dir) < -1e-9
    }

    /// Whether the triangle has collapsed to a line or point.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::zeros()
    }
}

/// What a projected path depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    /// Intersection of a body with the cut plane.
    Cut,
    /// Visible edge beyond the cut plane.
    Projection,
    /// Annotation curve.
    Annotation,
}

impl PathKind {
    /// CSS class name used in drawings.
    pub fn as_class(self) -> &'static str {
        match self {
            PathKind::Cut => "cut",
            PathKind::Projection => "projection",
            PathKind::Annotation => "annotation",
        }
    }
}

/// A polyline on paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPath {
    /// Ordered vertices in paper millimetres.
    pub points: Vec<Point2D>,
    /// Whether the last vertex connects back to the first.
    pub closed: bool,
    /// What the path depicts.
    pub kind: PathKind,
}

impl ProjectedPath {
    /// Create a new path.
    pub fn new(points: Vec<Point2D>, closed: bool, kind: PathKind) -> Self {
        Self {
            points,
            closed,
            kind,
        }
    }

    /// Bounding box of the path's vertices.
    pub fn bounds(&self) -> BoundingBox2D {
        let mut bb = BoundingBox2D::empty();
        for p in &self.points {
            bb.include_point(*p);
        }
        bb
    }
}
