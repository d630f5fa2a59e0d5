//! SVG output: layer writers and the compositor.

pub mod compose;
pub mod layers;
pub mod xml;

pub use compose::{compose, Layers};
pub use layers::{
    format_coord, layer_path, path_data, write_annotation, write_linework, write_underlay,
    DimensionFormat, LayerKind, IFC_NS,
};
pub use xml::{parse_document, read_document, write_document, Node, XmlElement};
