//! Feature edge extraction from triangle meshes.
//!
//! Only edges that carry drawing information are kept: sharp creases,
//! silhouettes against the view direction, and open mesh boundaries.
//! Edges between coplanar triangles (tessellation diagonals) are dropped.

use std::collections::HashMap;

use bimdraw_ir::TriangleMesh;

use crate::error::{ProjectionError, Result};
use crate::types::{EdgeType, MeshEdge, Point3, Triangle3D, Vec3};

/// Default crease angle in degrees above which an edge is sharp.
pub const DEFAULT_SHARP_ANGLE: f64 = 30.0;

/// Convert a mesh into triangles, validating indices.
pub fn mesh_triangles(mesh: &TriangleMesh) -> Result<Vec<Triangle3D>> {
    if mesh.indices.len() % 3 != 0 {
        return Err(ProjectionError::DegenerateMesh(format!(
            "{} indices is not a multiple of 3",
            mesh.indices.len()
        )));
    }
    let vertex = |i: u32| -> Result<Point3> {
        mesh.vertex(i as usize)
            .map(|[x, y, z]| Point3::new(x, y, z))
            .ok_or_else(|| {
                ProjectionError::DegenerateMesh(format!(
                    "index {i} out of range for {} vertices",
                    mesh.num_vertices()
                ))
            })
    };
    mesh.indices
        .chunks_exact(3)
        .map(|t| Ok(Triangle3D::new(vertex(t[0])?, vertex(t[1])?, vertex(t[2])?)))
        .collect()
}

/// Extract drawing edges for a viewer looking along `view_dir`.
pub fn extract_edges(
    mesh: &TriangleMesh,
    triangles: &[Triangle3D],
    view_dir: &Vec3,
    sharp_angle_deg: f64,
) -> Vec<MeshEdge> {
    let cos_threshold = sharp_angle_deg.to_radians().cos();

    // Undirected edge → adjacent triangles, in first-seen order
    let mut adjacency: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    let mut order: Vec<(u32, u32)> = Vec::new();
    for (t, idx) in mesh.indices.chunks_exact(3).enumerate() {
        if triangles[t].is_degenerate() {
            continue;
        }
        for (a, b) in [(idx[0], idx[1]), (idx[1], idx[2]), (idx[2], idx[0])] {
            let key = if a < b { (a, b) } else { (b, a) };
            let tris = adjacency.entry(key).or_default();
            if tris.is_empty() {
                order.push(key);
            }
            tris.push(t as u32);
        }
    }

    let mut edges = Vec::new();
    for key in order {
        let tris = &adjacency[&key];
        let edge_type = match tris.as_slice() {
            [t0] => Some((EdgeType::Boundary, *t0, None)),
            [t0, t1] => {
                let a = &triangles[*t0 as usize];
                let b = &triangles[*t1 as usize];
                if a.is_front_facing(view_dir) != b.is_front_facing(view_dir) {
                    Some((EdgeType::Silhouette, *t0, Some(*t1)))
                } else if a.normal.dot(&b.normal) < cos_threshold {
                    Some((EdgeType::Sharp, *t0, Some(*t1)))
                } else {
                    None
                }
            }
            // Non-manifold: always draw
            [t0, t1, ..] => Some((EdgeType::Sharp, *t0, Some(*t1))),
            [] => None,
        };
        if let Some((edge_type, tri0, tri1)) = edge_type {
            edges.push(MeshEdge::new(key.0, key.1, tri0, tri1, edge_type));
        }
    }
    edges
}
