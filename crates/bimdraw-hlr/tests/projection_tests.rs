//! End-to-end projection of simple building parts.

use approx::assert_relative_eq;
use bimdraw_hlr::{HlrEngine, PathKind, ProjectedPath, ProjectionEngine, ViewFrame};
use bimdraw_ir::{Camera, Geometry, TriangleMesh};

fn path_length(path: &ProjectedPath) -> f64 {
    let open: f64 = path.points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    match (path.closed, path.points.first(), path.points.last()) {
        (true, Some(first), Some(last)) => open + last.distance(first),
        _ => open,
    }
}

fn total_length(paths: &[ProjectedPath], kind: PathKind) -> f64 {
    paths.iter().filter(|p| p.kind == kind).map(path_length).sum()
}

#[test]
fn test_plan_of_wall_and_slab() {
    // 1:100 in a metre model: 10 paper mm per unit
    let frame = ViewFrame::new(&Camera::plan([5.0, 5.0, 1.2], 10.0, 10.0), 10.0).unwrap();
    let engine = HlrEngine::default();

    let wall = TriangleMesh::cuboid([1.0, 1.0, 0.0], [5.0, 1.2, 3.0]);
    let slab = TriangleMesh::cuboid([0.0, 0.0, -0.2], [8.0, 8.0, 0.0]);

    let wall_paths = engine.project(&Geometry::Mesh(wall), &frame).unwrap();
    assert_relative_eq!(total_length(&wall_paths, PathKind::Cut), 84.0, epsilon = 1e-6);
    assert_relative_eq!(total_length(&wall_paths, PathKind::Projection), 0.0);

    let slab_paths = engine.project(&Geometry::Mesh(slab), &frame).unwrap();
    assert!(slab_paths.iter().all(|p| p.kind == PathKind::Projection));
    assert_relative_eq!(total_length(&slab_paths, PathKind::Projection), 320.0, epsilon = 1e-6);
}

#[test]
fn test_elevation_hides_back_edges() {
    // Looking north at a 2x2x2 box from the south
    let camera = Camera::horizontal([1.0, -5.0, 1.0], [0.0, 1.0, 0.0], 4.0, 4.0);
    let frame = ViewFrame::new(&camera, 1.0).unwrap();
    let cube = TriangleMesh::cuboid([0.0, 0.0, 0.0], [2.0, 2.0, 2.0]);

    let paths = HlrEngine::default().project(&Geometry::Mesh(cube), &frame).unwrap();
    assert!(paths.iter().all(|p| p.kind == PathKind::Projection));
    // Only the front face outline survives
    assert_relative_eq!(total_length(&paths, PathKind::Projection), 8.0, epsilon = 1e-6);
}

#[test]
fn test_geometry_off_sheet_is_culled() {
    let frame = ViewFrame::new(&Camera::plan([0.0, 0.0, 1.0], 2.0, 2.0), 1.0).unwrap();
    let far = TriangleMesh::cuboid([50.0, 50.0, 0.0], [51.0, 51.0, 0.5]);
    let paths = HlrEngine::default().project(&Geometry::Mesh(far), &frame).unwrap();
    assert!(paths.is_empty());
}
