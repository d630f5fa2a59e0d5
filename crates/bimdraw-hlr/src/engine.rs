//! Projection engine: geometry in, paper-space paths out.

use bimdraw_ir::{Geometry, Polyline3, TriangleMesh};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edge_extract::{extract_edges, mesh_triangles, DEFAULT_SHARP_ANGLE};
use crate::error::{ProjectionError, Result};
use crate::hidden_line::{visible_runs, SectionCaps};
use crate::projection::{clip_to_front, ViewFrame};
use crate::section::{chain_segments, intersect_mesh_with_plane, DEFAULT_TOLERANCE};
use crate::types::{PathKind, Point2D, Point3, ProjectedPath};

/// Projects one representation's geometry through a view frame.
///
/// Engines run on worker threads and must be shareable.
pub trait ProjectionEngine: Sync {
    /// Stable description of every setting that influences output.
    ///
    /// Cached projections computed under a different fingerprint are
    /// never reused.
    fn fingerprint(&self) -> String;

    /// Project geometry into paper-space paths.
    fn project(&self, geometry: &Geometry, frame: &ViewFrame) -> Result<Vec<ProjectedPath>>;
}

/// Hidden-line engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HlrSettings {
    /// Crease angle in degrees above which mesh edges are drawn.
    pub sharp_angle: f64,
    /// Visibility samples per edge.
    pub samples: usize,
    /// Endpoint matching tolerance when chaining segments, in model units.
    pub chain_tolerance: f64,
    /// Projected runs shorter than this many paper millimetres are dropped.
    pub min_segment: f64,
}

impl Default for HlrSettings {
    fn default() -> Self {
        Self {
            sharp_angle: DEFAULT_SHARP_ANGLE,
            samples: 8,
            chain_tolerance: DEFAULT_TOLERANCE * 100.0,
            min_segment: 1e-3,
        }
    }
}

/// Polygonal hidden-line removal engine.
///
/// The camera location is the cut plane. Body meshes crossing it produce
/// closed `Cut` rings; visible feature edges beyond it produce `Projection`
/// paths. Hidden edges are dropped. Curves are clipped to the cut plane and
/// projected as-is.
#[derive(Debug, Clone, Default)]
pub struct HlrEngine {
    settings: HlrSettings,
}

impl HlrEngine {
    /// Engine with validated settings.
    pub fn new(settings: HlrSettings) -> Result<Self> {
        if settings.samples == 0 {
            return Err(ProjectionError::InvalidSettings("samples must be > 0".into()));
        }
        if !(settings.chain_tolerance > 0.0) {
            return Err(ProjectionError::InvalidSettings(format!(
                "chain tolerance {}",
                settings.chain_tolerance
            )));
        }
        if !(0.0..=180.0).contains(&settings.sharp_angle) {
            return Err(ProjectionError::InvalidSettings(format!(
                "sharp angle {}",
                settings.sharp_angle
            )));
        }
        Ok(Self { settings })
    }

    /// Active settings.
    pub fn settings(&self) -> &HlrSettings {
        &self.settings
    }

    fn project_mesh(&self, mesh: &TriangleMesh, frame: &ViewFrame) -> Result<Vec<ProjectedPath>> {
        let triangles = mesh_triangles(mesh)?;
        let tol = self.settings.chain_tolerance;
        let mut paths = Vec::new();

        // Cut
        let cut_segments = intersect_mesh_with_plane(&triangles, frame.origin(), frame.forward());
        let mut cap_rings = Vec::new();
        for (points, closed) in chain_segments(&cut_segments, tol) {
            let paper = to_paper(frame, &points);
            if closed {
                cap_rings.push(paper.clone());
            }
            paths.push(ProjectedPath::new(paper, closed, PathKind::Cut));
        }
        let caps = SectionCaps::new(cap_rings, tol * frame.paper_scale());

        // Projection
        let edges = extract_edges(mesh, &triangles, &frame.forward(), self.settings.sharp_angle);
        let mut visible = Vec::new();
        for edge in &edges {
            let (Some(a), Some(b)) = (vertex(mesh, edge.v0), vertex(mesh, edge.v1)) else {
                continue;
            };
            let Some((a, b)) = clip_to_front(frame, a, b) else {
                continue;
            };
            for (s, e) in visible_runs(frame, a, b, &triangles, edge, &caps, self.settings.samples) {
                if frame.to_paper(&s).distance(&frame.to_paper(&e)) >= self.settings.min_segment {
                    visible.push((s, e));
                }
            }
        }
        for (points, closed) in chain_segments(&visible, tol) {
            paths.push(ProjectedPath::new(
                to_paper(frame, &points),
                closed,
                PathKind::Projection,
            ));
        }

        debug!(
            triangles = triangles.len(),
            edges = edges.len(),
            cut_segments = cut_segments.len(),
            paths = paths.len(),
            "projected mesh"
        );
        Ok(paths)
    }

    fn project_curves(&self, polylines: &[Polyline3], frame: &ViewFrame) -> Vec<ProjectedPath> {
        let mut segments = Vec::new();
        for polyline in polylines {
            let pts: Vec<Point3> = polyline
                .points
                .iter()
                .map(|[x, y, z]| Point3::new(*x, *y, *z))
                .collect();
            let closing = match (polyline.closed, pts.first(), pts.last()) {
                (true, Some(first), Some(last)) if pts.len() > 2 => Some((*last, *first)),
                _ => None,
            };
            segments.extend(
                pts.windows(2)
                    .map(|w| (w[0], w[1]))
                    .chain(closing)
                    .filter_map(|(a, b)| clip_to_front(frame, a, b)),
            );
        }
        chain_segments(&segments, self.settings.chain_tolerance)
            .into_iter()
            .map(|(points, closed)| {
                ProjectedPath::new(to_paper(frame, &points), closed, PathKind::Projection)
            })
            .collect()
    }
}

impl ProjectionEngine for HlrEngine {
    fn fingerprint(&self) -> String {
        let s = &self.settings;
        format!(
            "hlr angle={} samples={} tol={} min={}",
            s.sharp_angle, s.samples, s.chain_tolerance, s.min_segment
        )
    }

    fn project(&self, geometry: &Geometry, frame: &ViewFrame) -> Result<Vec<ProjectedPath>> {
        let paths = match geometry {
            Geometry::Mesh(mesh) => self.project_mesh(mesh, frame)?,
            Geometry::Curves { polylines } => self.project_curves(polylines, frame),
        };
        let sheet = frame.paper_bounds();
        Ok(paths
            .into_iter()
            .filter(|p| p.points.len() >= 2 && p.bounds().intersects(&sheet))
            .collect())
    }
}

fn vertex(mesh: &TriangleMesh, i: u32) -> Option<Point3> {
    mesh.vertex(i as usize).map(|[x, y, z]| Point3::new(x, y, z))
}

fn to_paper(frame: &ViewFrame, points: &[Point3]) -> Vec<Point2D> {
    points.iter().map(|p| frame.to_paper(p)).collect()
}
