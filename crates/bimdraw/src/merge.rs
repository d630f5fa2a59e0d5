//! Polygon merging: same-material cut rings become single outlines.
//!
//! Walls of one material meeting at a junction are cut as separate rings
//! that overlap. Drawn separately they show seams, so the rings of each
//! material group are unioned into one polygon per connected region.

use std::panic::{catch_unwind, AssertUnwindSafe};

use bimdraw_hlr::{point_in_polygon, PathKind, Point2D, ProjectedPath};
use bimdraw_ir::{DrawingScale, LengthUnit};
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use tracing::{debug, warn};

use crate::config::MergeSettings;
use crate::extract::VectorFragment;

/// Counters from one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Material groups with at least one closed ring.
    pub groups: usize,
    /// Rings consumed by unions.
    pub rings: usize,
    /// Fragments emitted by unions.
    pub merged: usize,
    /// Interior rings dropped for being too small.
    pub holes_purged: usize,
    /// Groups left unmerged because the union failed.
    pub failed: usize,
}

/// Smallest hole kept, in square paper millimetres.
///
/// `tolerance_m` is a real-world length; it is converted to model units and
/// then to paper before squaring.
pub fn min_hole_area(unit: LengthUnit, scale: &DrawingScale, tolerance_m: f64) -> f64 {
    let side = unit.from_metres(tolerance_m) * unit.paper_mm_per_unit(scale.ratio);
    side * side
}

/// Merge closed cut rings of fragments that share a material.
///
/// Merged fragments come first, in material first-seen order, followed by
/// the remaining fragments in their original order. Fragments without a
/// material, or with the `null` material, are never touched. A material
/// whose rings all come from one fragment is still unioned, which folds its
/// overlapping rings together and purges its small holes.
pub fn merge_linework(
    fragments: Vec<VectorFragment>,
    settings: &MergeSettings,
    min_hole_area: f64,
) -> (Vec<VectorFragment>, MergeReport) {
    merge_with(fragments, settings, min_hole_area, |a, b| a.union(b))
}

fn merge_with<F>(
    fragments: Vec<VectorFragment>,
    settings: &MergeSettings,
    min_hole_area: f64,
    union: F,
) -> (Vec<VectorFragment>, MergeReport)
where
    F: Fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> MultiPolygon<f64>,
{
    let mut report = MergeReport::default();
    if !settings.enabled {
        return (fragments, report);
    }

    let mut materials: Vec<String> = Vec::new();
    for token in fragments.iter().filter_map(|f| f.material.as_deref()) {
        if token != "null" && !materials.iter().any(|m| m == token) {
            materials.push(token.to_string());
        }
    }

    let mut fragments = fragments;
    let mut emptied = vec![false; fragments.len()];
    let mut merged = Vec::new();
    for material in &materials {
        let members: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| f.material.as_deref() == Some(material.as_str()))
            .map(|(i, _)| i)
            .collect();

        let polygons: Vec<Polygon<f64>> = members
            .iter()
            .flat_map(|&i| fragment_polygons(&fragments[i], settings.ring_precision))
            .collect();
        if polygons.is_empty() {
            continue;
        }
        report.groups += 1;

        let Some(unioned) = union_all(polygons, &union) else {
            warn!(material = %material, "polygon union failed, keeping rings unmerged");
            report.failed += 1;
            continue;
        };

        let mut classes: Vec<String> = Vec::new();
        let mut guids = Vec::new();
        for &i in &members {
            let fragment = &mut fragments[i];
            let before = fragment.paths.len();
            fragment
                .paths
                .retain(|p| ring_points(p, settings.ring_precision).is_none());
            if fragment.paths.len() == before {
                continue;
            }
            report.rings += before - fragment.paths.len();
            emptied[i] = fragment.paths.is_empty();
            for class in &fragment.classes {
                if !classes.contains(class) {
                    classes.push(class.clone());
                }
            }
            guids.extend(fragment.guids.iter().cloned());
        }
        for guid in &guids {
            if !classes.iter().any(|c| c == guid.as_str()) {
                classes.push(guid.to_string());
            }
        }

        for polygon in unioned {
            let (paths, purged) = polygon_paths(&polygon, settings.ring_precision, min_hole_area);
            report.holes_purged += purged;
            if paths.is_empty() {
                continue;
            }
            merged.push(VectorFragment {
                guids: guids.clone(),
                classes: classes.clone(),
                material: Some(material.clone()),
                paths,
                merged: true,
                camera: false,
            });
            report.merged += 1;
        }
        debug!(material = %material, contributors = guids.len(), "merged material group");
    }

    let mut out = merged;
    out.extend(
        fragments
            .into_iter()
            .zip(emptied)
            .filter(|(_, emptied)| !emptied)
            .map(|(f, _)| f),
    );
    (out, report)
}

fn round_to(v: f64, places: u32) -> f64 {
    let f = 10f64.powi(places as i32);
    (v * f).round() / f
}

/// The ring's distinct points if `path` is a closed cut ring.
fn ring_points(path: &ProjectedPath, precision: u32) -> Option<Vec<Point2D>> {
    if path.kind != PathKind::Cut {
        return None;
    }
    let (first, last) = (path.points.first()?, path.points.last()?);
    let same_ends = round_to(first.x, precision) == round_to(last.x, precision)
        && round_to(first.y, precision) == round_to(last.y, precision);
    let mut points = path.points.clone();
    if same_ends && points.len() > 1 {
        points.pop();
    } else if !path.closed {
        return None;
    }
    (points.len() >= 3).then_some(points)
}

fn to_line_string(points: &[Point2D]) -> LineString<f64> {
    LineString::from(
        points
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

/// Polygons formed by a fragment's rings. A ring inside another ring of
/// the same fragment is a hole of it.
fn fragment_polygons(fragment: &VectorFragment, precision: u32) -> Vec<Polygon<f64>> {
    let mut rings: Vec<Vec<Point2D>> = fragment
        .paths
        .iter()
        .filter_map(|p| ring_points(p, precision))
        .collect();
    rings.sort_by(|a, b| {
        let area = |r: &[Point2D]| Polygon::new(to_line_string(r), vec![]).unsigned_area();
        area(b).total_cmp(&area(a))
    });

    let mut shells: Vec<(Vec<Point2D>, Vec<Vec<Point2D>>)> = Vec::new();
    for ring in rings {
        // Rings are sorted largest first, so the last containing shell is the innermost.
        let innermost = shells
            .iter()
            .rposition(|(shell, _)| point_in_polygon(&ring[0], shell));
        match innermost {
            Some(i) if !shells[i].1.iter().any(|hole| point_in_polygon(&ring[0], hole)) => {
                shells[i].1.push(ring)
            }
            _ => shells.push((ring, Vec::new())),
        }
    }
    shells
        .into_iter()
        .map(|(shell, holes)| {
            Polygon::new(
                to_line_string(&shell),
                holes.iter().map(|h| to_line_string(h)).collect(),
            )
        })
        .collect()
}

/// Union every polygon. `None` when the boolean kernel panics.
fn union_all<F>(polygons: Vec<Polygon<f64>>, union: &F) -> Option<MultiPolygon<f64>>
where
    F: Fn(&MultiPolygon<f64>, &MultiPolygon<f64>) -> MultiPolygon<f64>,
{
    catch_unwind(AssertUnwindSafe(|| {
        let mut polygons = polygons.into_iter();
        let first = MultiPolygon::new(vec![polygons.next()?]);
        Some(polygons.fold(first, |acc, p| union(&acc, &MultiPolygon::new(vec![p]))))
    }))
    .ok()
    .flatten()
}

/// Closed cut paths for a polygon's exterior and surviving interiors.
fn polygon_paths(polygon: &Polygon<f64>, precision: u32, min_hole_area: f64) -> (Vec<ProjectedPath>, usize) {
    let ring_path = |ring: &LineString<f64>| {
        let mut points: Vec<Point2D> = ring
            .coords()
            .map(|c| Point2D::new(round_to(c.x, precision), round_to(c.y, precision)))
            .collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        (points.len() >= 3).then(|| ProjectedPath::new(points, true, PathKind::Cut))
    };

    let mut paths: Vec<ProjectedPath> = ring_path(polygon.exterior()).into_iter().collect();
    if paths.is_empty() {
        return (paths, 0);
    }
    let mut purged = 0;
    for interior in polygon.interiors() {
        if Polygon::new(interior.clone(), vec![]).unsigned_area() < min_hole_area {
            purged += 1;
            continue;
        }
        paths.extend(ring_path(interior));
    }
    (paths, purged)
}
