//! Final document composition.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::layers::{format_coord, IFC_NS, SVG_NS, XLINK_NS};
use super::xml::{read_document, save_document, Node, XmlElement};
use crate::error::{DrawError, Result};

/// Layer documents to combine. Any may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layers<'a> {
    /// Raster underlay layer.
    pub underlay: Option<&'a Path>,
    /// Vector linework layer.
    pub linework: Option<&'a Path>,
    /// Annotation layer.
    pub annotation: Option<&'a Path>,
}

/// Body of a layer: the root element's children.
fn layer_body(path: &Path) -> Result<Vec<Node>> {
    let root = read_document(path)?;
    if root.name != "svg" {
        return Err(DrawError::Layer {
            path: path.to_path_buf(),
            reason: format!("root element is <{}>, expected <svg>", root.name),
        });
    }
    Ok(root.children)
}

/// Copy the underlay's companion raster next to `output` as
/// `<output stem>-underlay.png`. Returns the new file name when a raster
/// was found.
fn copy_underlay_raster(underlay: &Path, output: &Path) -> Result<Option<String>> {
    let raster = underlay.with_extension("png");
    if !raster.exists() {
        return Ok(None);
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| DrawError::OutputPath(output.to_path_buf()))?;
    let name = format!("{stem}-underlay.png");
    let target = output.with_file_name(&name);
    std::fs::copy(&raster, &target)?;
    debug!(from = %raster.display(), to = %target.display(), "copied underlay raster");
    Ok(Some(name))
}

/// Compose layer documents into the final drawing at `output`.
///
/// Each layer's root `<svg>` is dropped and its children concatenated in
/// paint order (underlay, linework, annotation) under a fresh root sized to
/// `paper` millimetres. The linework layer's `<defs>` and `<style>` are
/// dropped, and the children of its top-level group are reversed.
pub fn compose(
    layers: &Layers<'_>,
    output: &Path,
    paper: (f64, f64),
    stylesheet: Option<&str>,
) -> Result<PathBuf> {
    if output.file_name().is_none() {
        return Err(DrawError::OutputPath(output.to_path_buf()));
    }
    let (w, h) = paper;
    let mut root = XmlElement::new("svg")
        .attr("xmlns", SVG_NS)
        .attr("xmlns:ifc", IFC_NS)
        .attr("xmlns:xlink", XLINK_NS)
        .attr("width", format!("{}mm", format_coord(w, 4)))
        .attr("height", format!("{}mm", format_coord(h, 4)))
        .attr("viewBox", format!("0 0 {} {}", format_coord(w, 4), format_coord(h, 4)));

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    if let Some(path) = layers.underlay {
        let mut body = layer_body(path)?;
        if let Some(name) = copy_underlay_raster(path, output)? {
            for node in &mut body {
                if let Node::Element(e) = node {
                    e.walk_mut(&mut |el| {
                        if el.name == "image" {
                            for key in ["xlink:href", "href"] {
                                if el.get_attr(key).is_some() {
                                    el.set_attr(key, name.as_str());
                                }
                            }
                        }
                    });
                }
            }
        }
        root.children.extend(body);
    }

    if let Some(path) = layers.linework {
        let mut body = layer_body(path)?;
        body.retain(|n| !matches!(n, Node::Element(e) if e.name == "defs" || e.name == "style"));
        let top = body.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.name == "g" => Some(e),
            _ => None,
        });
        if let Some(group) = top {
            group.children.reverse();
        }
        root.children.extend(body);
    }

    if let Some(path) = layers.annotation {
        root.children.extend(layer_body(path)?);
    }

    save_document(&root, stylesheet, output)?;
    info!(output = %output.display(), "composed drawing");
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_missing_layers_are_valid() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plan.svg");
        compose(&Layers::default(), &out, (10.0, 10.0), Some("default.css")).unwrap();
        let root = read_document(&out).unwrap();
        assert_eq!(root.get_attr("viewBox"), Some("0 0 10 10"));
        assert_eq!(root.get_attr("xmlns:ifc"), Some(IFC_NS));
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_linework_defs_stripped_and_reversed() {
        let dir = tempfile::tempdir().unwrap();
        let linework = dir.path().join("cache/plan-linework.svg");
        write(
            &linework,
            r#"<svg><defs><pattern id="hatch"/></defs><style>.cut{}</style>
               <g><g ifc:guid="A"/><g ifc:guid="B"/></g></svg>"#,
        );
        let out = dir.path().join("plan.svg");
        compose(
            &Layers {
                linework: Some(&linework),
                ..Layers::default()
            },
            &out,
            (10.0, 10.0),
            None,
        )
        .unwrap();

        let root = read_document(&out).unwrap();
        assert_eq!(root.count("defs"), 0);
        assert_eq!(root.count("style"), 0);
        let group = root.elements().next().unwrap();
        let guids: Vec<_> = group.elements().filter_map(|g| g.get_attr("ifc:guid")).collect();
        assert_eq!(guids, vec!["B", "A"]);
    }

    #[test]
    fn test_bad_layer_root() {
        let dir = tempfile::tempdir().unwrap();
        let layer = dir.path().join("a.svg");
        write(&layer, "<html/>");
        let err = compose(
            &Layers {
                annotation: Some(&layer),
                ..Layers::default()
            },
            &dir.path().join("out.svg"),
            (1.0, 1.0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DrawError::Layer { .. }));
    }
}
