//! Section cutting: plane-mesh intersection and segment chaining.

use std::collections::HashMap;

use crate::types::{Point2D, Point3, Triangle3D, Vec3};

/// Default tolerance for geometric comparisons, in model units.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Plane-Triangle Intersection
// ============================================================================

/// Points where the plane crosses a triangle. Anything but exactly two
/// points (a proper cut segment) comes back empty.
fn intersect_triangle_with_plane(
    tri: &Triangle3D,
    plane_origin: Point3,
    plane_normal: &Vec3,
    tol: f64,
) -> Vec<Point3> {
    let vs = [tri.v0, tri.v1, tri.v2];
    let d = vs.map(|v| plane_normal.dot(&(v - plane_origin)));

    let mut points: Vec<Point3> = Vec::with_capacity(3);
    let mut push = |p: Point3| {
        if !points.iter().any(|q| (*q - p).norm() < tol) {
            points.push(p);
        }
    };

    for i in 0..3 {
        if d[i].abs() < tol {
            push(vs[i]);
        }
    }
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        let opposite = (d[i] > tol && d[j] < -tol) || (d[i] < -tol && d[j] > tol);
        if opposite {
            let t = d[i] / (d[i] - d[j]);
            push(vs[i] + (vs[j] - vs[i]) * t);
        }
    }

    // A face lying in the plane yields three points; its edges are
    // produced by the neighbouring faces instead.
    if points.len() != 2 {
        points.clear();
    }
    points
}

/// Intersect triangles with a plane, returning 3D line segments.
pub fn intersect_mesh_with_plane(
    triangles: &[Triangle3D],
    plane_origin: Point3,
    plane_normal: Vec3,
) -> Vec<(Point3, Point3)> {
    let normal = plane_normal.normalize();
    triangles
        .iter()
        .filter(|t| !t.is_degenerate())
        .filter_map(|t| {
            let pts = intersect_triangle_with_plane(t, plane_origin, &normal, DEFAULT_TOLERANCE);
            match pts.as_slice() {
                [a, b] => Some((*a, *b)),
                _ => None,
            }
        })
        .collect()
}

// ============================================================================
// Segment Chaining
// ============================================================================

/// Grid cell of a point, so nearby endpoints share a hash key.
fn point_key(p: &Point3, tolerance: f64) -> (i64, i64, i64) {
    let scale = 1.0 / tolerance;
    (
        (p.x * scale).round() as i64,
        (p.y * scale).round() as i64,
        (p.z * scale).round() as i64,
    )
}

/// Join cut segments end to end into polylines.
///
/// Endpoints within `tolerance` are treated as shared. Each polyline comes
/// with a closed flag; closed rings do not repeat their first point.
pub fn chain_segments(segments: &[(Point3, Point3)], tolerance: f64) -> Vec<(Vec<Point3>, bool)> {
    if segments.is_empty() {
        return Vec::new();
    }

    let mut adjacency: HashMap<(i64, i64, i64), Vec<(usize, bool)>> = HashMap::new();
    for (i, (p0, p1)) in segments.iter().enumerate() {
        adjacency
            .entry(point_key(p0, tolerance))
            .or_default()
            .push((i, false));
        adjacency
            .entry(point_key(p1, tolerance))
            .or_default()
            .push((i, true));
    }

    let mut used = vec![false; segments.len()];
    let mut polylines = Vec::new();

    // Next unused segment touching `current`, and the point it leads to.
    let next = |current: &Point3, used: &[bool]| -> Option<(usize, Point3)> {
        adjacency
            .get(&point_key(current, tolerance))?
            .iter()
            .find(|(seg, _)| !used[*seg])
            .map(|&(seg, is_end)| {
                let (s0, s1) = segments[seg];
                (seg, if is_end { s0 } else { s1 })
            })
    };

    for seed in 0..segments.len() {
        if used[seed] {
            continue;
        }

        let (p0, p1) = segments[seed];
        let mut chain = std::collections::VecDeque::from([p0, p1]);
        used[seed] = true;

        let mut current = p1;
        while let Some((seg, pt)) = next(&current, &used) {
            used[seg] = true;
            chain.push_back(pt);
            current = pt;
        }

        // then back from the start
        let mut current = p0;
        while let Some((seg, pt)) = next(&current, &used) {
            used[seg] = true;
            chain.push_front(pt);
            current = pt;
        }

        let mut chain: Vec<Point3> = chain.into();
        let is_closed = chain.len() >= 4
            && match (chain.first(), chain.last()) {
                (Some(first), Some(last)) => (*first - *last).norm() < tolerance,
                _ => false,
            };
        if is_closed {
            chain.pop();
        }

        polylines.push((chain, is_closed));
    }

    polylines
}

/// Even-odd containment of `p` in a ring.
pub fn point_in_polygon(p: &Point2D, polygon: &[Point2D]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = &polygon[i];
        let vj = &polygon[j];

        if ((vi.y > p.y) != (vj.y > p.y))
            && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimdraw_ir::TriangleMesh;

    use crate::edge_extract::mesh_triangles;

    #[test]
    fn test_triangle_no_intersection() {
        let tri = Triangle3D::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let pts = intersect_triangle_with_plane(
            &tri,
            Point3::new(0.0, 0.0, 5.0),
            &Vec3::new(0.0, 0.0, 1.0),
            DEFAULT_TOLERANCE,
        );
        assert!(pts.is_empty());
    }

    #[test]
    fn test_cube_horizontal_section() {
        let mesh = TriangleMesh::cuboid([0.0; 3], [10.0, 10.0, 10.0]);
        let tris = mesh_triangles(&mesh).unwrap();
        let segments = intersect_mesh_with_plane(
            &tris,
            Point3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        // Two triangles per side face
        assert_eq!(segments.len(), 8);

        let chains = chain_segments(&segments, 1e-4);
        assert_eq!(chains.len(), 1);
        let (points, closed) = &chains[0];
        assert!(*closed);
        assert!(points.len() >= 4);
        assert!(points.iter().all(|p| (p.z - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_open_chain() {
        let segments = vec![
            (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            (Point3::new(2.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
        ];
        let chains = chain_segments(&segments, 1e-6);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].0.len(), 3);
        assert!(!chains[0].1);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(&Point2D::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(&Point2D::new(15.0, 5.0), &square));
    }
}
