//! Hidden line classification by ray casting toward the viewer.
//!
//! An edge is split into equal sub-segments; each sub-segment's midpoint is
//! tested against the mesh triangles between it and the cut plane, and
//! against the section caps lying on the cut plane itself.

use crate::projection::ViewFrame;
use crate::section::point_in_polygon;
use crate::types::{MeshEdge, Point2D, Point3, Triangle3D, Vec3, Visibility};

const RAY_EPSILON: f64 = 1e-9;

/// Ray–triangle intersection (Möller–Trumbore).
///
/// Returns the ray parameter of the hit, if any.
pub fn ray_hits_triangle(origin: &Point3, dir: &Vec3, tri: &Triangle3D) -> Option<f64> {
    let e1 = tri.v1 - tri.v0;
    let e2 = tri.v2 - tri.v0;
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < RAY_EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = *origin - tri.v0;
    let u = s.dot(&p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    Some(e2.dot(&q) * inv)
}

/// Closed section rings on the cut plane, in paper coordinates.
#[derive(Debug, Default)]
pub struct SectionCaps {
    rings: Vec<Vec<Point2D>>,
    tolerance: f64,
}

impl SectionCaps {
    /// Caps from closed cut rings. Points within `tolerance` paper
    /// millimetres of a ring's outline count as covered.
    pub fn new(rings: Vec<Vec<Point2D>>, tolerance: f64) -> Self {
        Self { rings, tolerance }
    }

    /// Whether a paper point lies inside or on any cap.
    pub fn covers(&self, p: &Point2D) -> bool {
        self.rings.iter().any(|ring| {
            point_in_polygon(p, ring) || distance_to_ring(p, ring) <= self.tolerance
        })
    }
}

fn distance_to_ring(p: &Point2D, ring: &[Point2D]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| distance_to_segment(p, &ring[i], &ring[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

fn distance_to_segment(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    p.distance(&Point2D::new(a.x + t * dx, a.y + t * dy))
}

/// Classify a single point on `edge`.
pub fn point_visibility(
    frame: &ViewFrame,
    p: &Point3,
    triangles: &[Triangle3D],
    edge: &MeshEdge,
    caps: &SectionCaps,
) -> Visibility {
    let depth = frame.depth(p);
    if depth > RAY_EPSILON && caps.covers(&frame.to_paper(p)) {
        return Visibility::Hidden;
    }

    let toward_viewer = -frame.forward();
    let blocked = triangles.iter().enumerate().any(|(i, tri)| {
        if edge.touches(i as u32) || tri.is_degenerate() {
            return false;
        }
        matches!(
            ray_hits_triangle(p, &toward_viewer, tri),
            Some(t) if t > RAY_EPSILON && t < depth - RAY_EPSILON
        )
    });

    if blocked {
        Visibility::Hidden
    } else {
        Visibility::Visible
    }
}

/// Visible runs of the segment `a → b`, sampled `samples` times.
///
/// Consecutive visible samples merge into one run.
pub fn visible_runs(
    frame: &ViewFrame,
    a: Point3,
    b: Point3,
    triangles: &[Triangle3D],
    edge: &MeshEdge,
    caps: &SectionCaps,
    samples: usize,
) -> Vec<(Point3, Point3)> {
    let samples = samples.max(1);
    let at = |t: f64| a + (b - a) * t;

    let mut runs = Vec::new();
    let mut run_start: Option<f64> = None;
    for i in 0..samples {
        let t0 = i as f64 / samples as f64;
        let t1 = (i + 1) as f64 / samples as f64;
        let mid = at((t0 + t1) / 2.0);
        let visible = point_visibility(frame, &mid, triangles, edge, caps) == Visibility::Visible;
        match (visible, run_start) {
            (true, None) => run_start = Some(t0),
            (false, Some(s)) => {
                runs.push((at(s), at(t0)));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        runs.push((at(s), b));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeType;
    use bimdraw_ir::Camera;

    #[test]
    fn test_ray_triangle() {
        let tri = Triangle3D::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(0.0, 2.0, 1.0),
        );
        let up = Vec3::new(0.0, 0.0, 1.0);
        let t = ray_hits_triangle(&Point3::new(0.5, 0.5, 0.0), &up, &tri).unwrap();
        assert!((t - 1.0).abs() < 1e-12);
        assert!(ray_hits_triangle(&Point3::new(1.5, 1.5, 0.0), &up, &tri).is_none());
        // Parallel ray
        assert!(ray_hits_triangle(&Point3::new(0.5, 0.5, 0.0), &Vec3::new(1.0, 0.0, 0.0), &tri).is_none());
    }

    #[test]
    fn test_edge_under_roof_is_hidden() {
        let frame = ViewFrame::new(&Camera::plan([0.0, 0.0, 10.0], 10.0, 10.0), 1.0).unwrap();
        let roof = vec![
            Triangle3D::new(
                Point3::new(-5.0, -5.0, 2.0),
                Point3::new(5.0, -5.0, 2.0),
                Point3::new(5.0, 5.0, 2.0),
            ),
            Triangle3D::new(
                Point3::new(-5.0, -5.0, 2.0),
                Point3::new(5.0, 5.0, 2.0),
                Point3::new(-5.0, 5.0, 2.0),
            ),
        ];
        // Edge with adjacency outside the roof triangles
        let edge = MeshEdge::new(10, 11, 99, None, EdgeType::Boundary);
        let runs = visible_runs(
            &frame,
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            &roof,
            &edge,
            &SectionCaps::default(),
            4,
        );
        assert!(runs.is_empty());

        // Half the edge sticks out past the roof
        let runs = visible_runs(
            &frame,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            &roof,
            &edge,
            &SectionCaps::default(),
            4,
        );
        assert_eq!(runs.len(), 1);
        assert!((runs[0].0.x - 5.0).abs() < 1e-9);
        assert!((runs[0].1.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_caps_cover_boundary() {
        let caps = SectionCaps::new(
            vec![vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(4.0, 0.0),
                Point2D::new(4.0, 4.0),
                Point2D::new(0.0, 4.0),
            ]],
            1e-6,
        );
        assert!(caps.covers(&Point2D::new(2.0, 2.0)));
        assert!(caps.covers(&Point2D::new(4.0, 2.0)));
        assert!(!caps.covers(&Point2D::new(5.0, 2.0)));
    }
}
