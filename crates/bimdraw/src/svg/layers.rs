//! Layer documents: underlay, linework, annotation.
//!
//! Each layer is a standalone SVG sized to the sheet, written under the
//! drawing's `cache/` directory so it can be reused by later runs.

use std::path::{Path, PathBuf};

use bimdraw_hlr::{PathKind, Point2D, Point3, ViewFrame};
use bimdraw_ir::{Annotation, AnnotationKind, Element};
use tracing::debug;

use super::xml::{save_document, XmlElement};
use crate::error::Result;
use crate::extract::VectorFragment;

/// SVG namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// XLink namespace, used by `<image>` references.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
/// Element metadata namespace, bound to the `ifc` prefix.
pub const IFC_NS: &str = "http://www.ifcopenshell.org/ns";

/// The three layer kinds, in paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Rendered raster beneath everything.
    Underlay,
    /// Vector linework.
    Linework,
    /// Text, dimensions, symbols.
    Annotation,
}

impl LayerKind {
    /// Suffix used in layer file names.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Underlay => "underlay",
            LayerKind::Linework => "linework",
            LayerKind::Annotation => "annotation",
        }
    }
}

/// `<drawing dir>/cache/<name>-<kind>.svg`
pub fn layer_path(drawing_dir: &Path, drawing_name: &str, kind: LayerKind) -> PathBuf {
    drawing_dir
        .join("cache")
        .join(format!("{}-{}.svg", file_stem(drawing_name), kind.as_str()))
}

/// Drawing name made safe for a file name; separators and control
/// characters become underscores.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Format a coordinate with at most `precision` decimals, no trailing
/// zeros, and no negative zero.
pub fn format_coord(v: f64, precision: usize) -> String {
    let s = format!("{v:.precision$}");
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s.as_str()
    };
    match s {
        "-0" => "0".to_string(),
        s => s.to_string(),
    }
}

/// SVG path data for one polyline: `M x,y L x,y ... [Z]`.
pub fn path_data(points: &[Point2D], closed: bool, precision: usize) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        d.push_str(if i == 0 { "M " } else { "L " });
        d.push_str(&format_coord(p.x, precision));
        d.push(',');
        d.push_str(&format_coord(p.y, precision));
    }
    if closed && !d.is_empty() {
        d.push_str(" Z");
    }
    d
}

fn sheet(paper: (f64, f64)) -> XmlElement {
    let (w, h) = paper;
    XmlElement::new("svg")
        .attr("xmlns", SVG_NS)
        .attr("xmlns:xlink", XLINK_NS)
        .attr("xmlns:ifc", IFC_NS)
        .attr("width", format!("{}mm", format_coord(w, 4)))
        .attr("height", format!("{}mm", format_coord(h, 4)))
        .attr("viewBox", format!("0 0 {} {}", format_coord(w, 4), format_coord(h, 4)))
}

/// Write the underlay layer and copy `raster` next to it.
///
/// The copy is named after the layer document (`<name>-underlay.png`), which
/// is where the compositor expects to find it.
pub fn write_underlay(path: &Path, raster: &Path, paper: (f64, f64)) -> Result<()> {
    let png = path.with_extension("png");
    if let Some(dir) = png.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::copy(raster, &png)?;

    let href = png
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image = XmlElement::new("image")
        .attr("x", "0")
        .attr("y", "0")
        .attr("width", format_coord(paper.0, 4))
        .attr("height", format_coord(paper.1, 4))
        .attr("xlink:href", href);
    save_document(&sheet(paper).child(image), None, path)?;
    debug!(path = %path.display(), "wrote underlay layer");
    Ok(())
}

fn defs() -> XmlElement {
    let hatch = XmlElement::new("pattern")
        .attr("id", "hatch")
        .attr("patternUnits", "userSpaceOnUse")
        .attr("width", "1.5")
        .attr("height", "1.5")
        .attr("patternTransform", "rotate(45)")
        .child(
            XmlElement::new("line")
                .attr("x1", "0")
                .attr("y1", "0")
                .attr("x2", "0")
                .attr("y2", "1.5")
                .attr("class", "hatch"),
        );
    let arrow = XmlElement::new("marker")
        .attr("id", "arrow")
        .attr("viewBox", "0 0 10 10")
        .attr("refX", "10")
        .attr("refY", "5")
        .attr("markerWidth", "3")
        .attr("markerHeight", "3")
        .attr("orient", "auto-start-reverse")
        .child(XmlElement::new("path").attr("d", "M 0,0 L 10,5 L 0,10 Z"));
    XmlElement::new("defs").child(hatch).child(arrow)
}

fn fragment_group(fragment: &VectorFragment, precision: usize) -> XmlElement {
    let mut group = XmlElement::new("g");
    if let Some(guid) = fragment.guid() {
        group.set_attr("ifc:guid", guid.as_str());
    }
    group.set_attr("class", fragment.classes.join(" "));

    for kind in [PathKind::Cut, PathKind::Projection, PathKind::Annotation] {
        let d: Vec<String> = fragment
            .paths
            .iter()
            .filter(|p| p.kind == kind && p.points.len() >= 2)
            .map(|p| path_data(&p.points, p.closed, precision))
            .collect();
        if !d.is_empty() {
            group = group.child(
                XmlElement::new("path")
                    .attr("d", d.join(" "))
                    .attr("class", kind.as_class()),
            );
        }
    }
    group
}

/// Write the linework layer.
///
/// Fragments holding cut paths are written before projection-only ones, so
/// that once the compositor reverses the group, cuts paint above
/// projections. Camera fragments go last.
pub fn write_linework(
    path: &Path,
    fragments: &[VectorFragment],
    paper: (f64, f64),
    precision: usize,
) -> Result<()> {
    let (camera, body): (Vec<&VectorFragment>, Vec<&VectorFragment>) =
        fragments.iter().partition(|f| f.camera);
    let mut ordered = body;
    ordered.sort_by_key(|f| !f.paths.iter().any(|p| p.kind == PathKind::Cut));
    ordered.extend(camera);

    let mut group = XmlElement::new("g");
    for fragment in ordered {
        group = group.child(fragment_group(fragment, precision));
    }
    save_document(&sheet(paper).child(defs()).child(group), None, path)?;
    debug!(path = %path.display(), fragments = fragments.len(), "wrote linework layer");
    Ok(())
}

/// How dimension labels are rounded and printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionFormat {
    /// Round lengths to a multiple of this, in model units. Zero disables.
    pub precision: f64,
    /// Digits after the decimal point.
    pub decimal_places: usize,
}

impl DimensionFormat {
    /// Read `MetricPrecision` (else `ImperialPrecision`) and `DecimalPlaces`
    /// from the camera's drawing property set.
    pub fn from_camera(camera: Option<&Element>, pset: &str, default_decimal_places: usize) -> Self {
        let number = |key: &str| {
            camera
                .and_then(|c| c.pset_value(pset, key))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
        };
        let decimal_places = camera
            .and_then(|c| c.pset_value(pset, "DecimalPlaces"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(default_decimal_places);
        Self {
            precision: number("MetricPrecision")
                .or_else(|| number("ImperialPrecision"))
                .unwrap_or(0.0),
            decimal_places,
        }
    }

    /// Label for a measured length.
    pub fn label(&self, length: f64) -> String {
        let rounded = if self.precision > 0.0 {
            (length / self.precision).round() * self.precision
        } else {
            length
        };
        format!("{rounded:.prec$}", prec = self.decimal_places)
    }
}

fn paper_point(frame: &ViewFrame, p: [f64; 3]) -> Point2D {
    frame.to_paper(&Point3::new(p[0], p[1], p[2]))
}

fn annotation_element(
    annotation: &Annotation,
    frame: &ViewFrame,
    format: &DimensionFormat,
    precision: usize,
) -> XmlElement {
    let group = XmlElement::new("g")
        .attr("ifc:guid", annotation.guid.as_str())
        .attr("class", "annotation");
    match &annotation.kind {
        AnnotationKind::Text { position, text } => {
            let at = paper_point(frame, *position);
            group.child(
                XmlElement::new("text")
                    .attr("x", format_coord(at.x, precision))
                    .attr("y", format_coord(at.y, precision))
                    .text(text.as_str()),
            )
        }
        AnnotationKind::Polyline { points } => {
            let points: Vec<Point2D> = points.iter().map(|p| paper_point(frame, *p)).collect();
            group.child(XmlElement::new("path").attr("d", path_data(&points, false, precision)))
        }
        AnnotationKind::Dimension { start, end } => {
            let (a, b) = (paper_point(frame, *start), paper_point(frame, *end));
            let length = (Point3::from(*end) - Point3::from(*start)).norm();
            let mid = Point2D::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            group
                .attr("class", "annotation dimension")
                .child(
                    XmlElement::new("path")
                        .attr("d", path_data(&[a, b], false, precision))
                        .attr("marker-start", "url(#arrow)")
                        .attr("marker-end", "url(#arrow)"),
                )
                .child(
                    XmlElement::new("text")
                        .attr("x", format_coord(mid.x, precision))
                        .attr("y", format_coord(mid.y, precision))
                        .text(format.label(length)),
                )
        }
    }
}

/// Write the annotation layer, lowest z-index first.
pub fn write_annotation(
    path: &Path,
    annotations: &[&Annotation],
    frame: &ViewFrame,
    format: &DimensionFormat,
    precision: usize,
) -> Result<()> {
    let mut sorted = annotations.to_vec();
    sorted.sort_by_key(|a| a.z_index);

    let mut group = XmlElement::new("g");
    for annotation in sorted {
        group = group.child(annotation_element(annotation, frame, format, precision));
    }
    save_document(&sheet(frame.paper_size()).child(group), None, path)?;
    debug!(path = %path.display(), annotations = annotations.len(), "wrote annotation layer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::xml::read_document;
    use bimdraw_hlr::ProjectedPath;
    use bimdraw_ir::{Camera, Guid};

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(1.5, 4), "1.5");
        assert_eq!(format_coord(2.0, 4), "2");
        assert_eq!(format_coord(-0.00001, 4), "0");
        assert_eq!(format_coord(12.34567, 2), "12.35");
        assert_eq!(format_coord(100.0, 0), "100");
    }

    #[test]
    fn test_path_data() {
        let pts = [Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), Point2D::new(10.0, 5.25)];
        assert_eq!(path_data(&pts, true, 4), "M 0,0 L 10,0 L 10,5.25 Z");
        assert_eq!(path_data(&pts[..2], false, 4), "M 0,0 L 10,0");
        assert_eq!(path_data(&[], true, 4), "");
    }

    #[test]
    fn test_layer_path() {
        let p = layer_path(Path::new("/out/drawings"), "A/101 PLAN", LayerKind::Linework);
        assert_eq!(p, PathBuf::from("/out/drawings/cache/A_101 PLAN-linework.svg"));
    }

    #[test]
    fn test_dimension_format() {
        let camera = Element::new("cam", "IfcAnnotation")
            .with_property("EPset_Drawing", "ImperialPrecision", "0.5")
            .with_property("EPset_Drawing", "DecimalPlaces", "1");
        let f = DimensionFormat::from_camera(Some(&camera), "EPset_Drawing", 2);
        assert_eq!(f.label(3.3), "3.5");

        let bare = DimensionFormat::from_camera(None, "EPset_Drawing", 2);
        assert_eq!(bare.label(3.14159), "3.14");
    }

    #[test]
    fn test_linework_orders_cuts_first_camera_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/plan-linework.svg");
        let frag = |guid: &str, kind: PathKind| VectorFragment {
            guids: vec![Guid::from(guid)],
            classes: vec![kind.as_class().to_string()],
            material: None,
            paths: vec![ProjectedPath::new(
                vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
                false,
                kind,
            )],
            merged: false,
            camera: false,
        };
        let fragments = vec![
            frag("p", PathKind::Projection),
            frag("c", PathKind::Cut),
            VectorFragment {
                guids: vec![Guid::from("cam")],
                classes: vec!["projection".into()],
                material: None,
                paths: vec![],
                merged: false,
                camera: true,
            },
        ];
        write_linework(&path, &fragments, (100.0, 50.0), 4).unwrap();

        let root = read_document(&path).unwrap();
        assert_eq!(root.get_attr("width"), Some("100mm"));
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["defs", "g"]);
        let top = root.elements().nth(1).unwrap();
        let guids: Vec<_> = top.elements().filter_map(|g| g.get_attr("ifc:guid")).collect();
        assert_eq!(guids, vec!["c", "p", "cam"]);
    }

    #[test]
    fn test_linework_without_camera_sorts_every_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan-linework.svg");
        let frag = |guid: &str, kind: PathKind, camera: bool| VectorFragment {
            guids: vec![Guid::from(guid)],
            classes: vec![kind.as_class().to_string()],
            material: None,
            paths: vec![ProjectedPath::new(
                vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
                false,
                kind,
            )],
            merged: false,
            camera,
        };
        let guids = |fragments: &[VectorFragment]| {
            write_linework(&path, fragments, (10.0, 10.0), 4).unwrap();
            let root = read_document(&path).unwrap();
            let top = root.elements().nth(1).unwrap();
            top.elements()
                .filter_map(|g| g.get_attr("ifc:guid").map(str::to_string))
                .collect::<Vec<_>>()
        };

        // A merge that consumed the camera leaves a cut fragment at the end
        let fragments = vec![frag("p", PathKind::Projection, false), frag("c", PathKind::Cut, false)];
        assert_eq!(guids(&fragments), vec!["c", "p"]);

        let fragments = vec![
            frag("cam", PathKind::Cut, true),
            frag("p", PathKind::Projection, false),
            frag("c", PathKind::Cut, false),
        ];
        assert_eq!(guids(&fragments), vec!["c", "p", "cam"]);
    }

    #[test]
    fn test_annotation_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan-annotation.svg");
        let frame = ViewFrame::new(&Camera::plan([5.0, 5.0, 1.0], 10.0, 10.0), 10.0).unwrap();
        let top = Annotation {
            guid: Guid::from("t"),
            z_index: 5,
            kind: AnnotationKind::Text {
                position: [5.0, 5.0, 0.0],
                text: "LIVING".into(),
            },
        };
        let dim = Annotation {
            guid: Guid::from("d"),
            z_index: 1,
            kind: AnnotationKind::Dimension {
                start: [0.0, 0.0, 0.0],
                end: [3.0, 4.0, 0.0],
            },
        };
        let format = DimensionFormat {
            precision: 0.0,
            decimal_places: 2,
        };
        write_annotation(&path, &[&top, &dim], &frame, &format, 4).unwrap();

        let root = read_document(&path).unwrap();
        let group = root.elements().next().unwrap();
        let guids: Vec<_> = group.elements().filter_map(|g| g.get_attr("ifc:guid")).collect();
        assert_eq!(guids, vec!["d", "t"]);
        assert_eq!(root.count("text"), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(">5.00<"));
        assert!(text.contains(r#"x="50""#));
    }

    #[test]
    fn test_underlay_copies_raster() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("render.png");
        std::fs::write(&raster, b"\x89PNG").unwrap();
        let path = dir.path().join("cache/plan-underlay.svg");
        write_underlay(&path, &raster, (420.0, 297.0)).unwrap();

        assert!(dir.path().join("cache/plan-underlay.png").exists());
        let root = read_document(&path).unwrap();
        let image = root.elements().next().unwrap();
        assert_eq!(image.get_attr("xlink:href"), Some("plan-underlay.png"));
    }
}
