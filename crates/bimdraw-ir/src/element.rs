//! Model elements, their geometry, materials, and annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::ContextId;

/// Globally unique element identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(pub String);

impl Guid {
    /// Create a GUID from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Material assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Material {
    /// A single named material.
    Single {
        /// Material name, may be unset.
        #[serde(default)]
        name: Option<String>,
    },
    /// A layered material; drawings use the layer-set name.
    LayerSet {
        /// Layer set name, may be unset.
        #[serde(default)]
        layer_set_name: Option<String>,
    },
}

impl Material {
    /// Name used for drawing classification. Unset or empty names become `"null"`.
    pub fn resolved_name(&self) -> &str {
        let name = match self {
            Material::Single { name } => name.as_deref(),
            Material::LayerSet { layer_set_name } => layer_set_name.as_deref(),
        };
        match name {
            Some(n) if !n.is_empty() => n,
            _ => "null",
        }
    }
}

/// Indexed triangle mesh with flat `[x, y, z, ...]` positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<f64>,
    /// Triangle indices, three per face.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex position by index, or `None` when out of range.
    pub fn vertex(&self, i: usize) -> Option<[f64; 3]> {
        let base = i * 3;
        self.vertices
            .get(base..base + 3)
            .map(|v| [v[0], v[1], v[2]])
    }

    /// Axis-aligned box from `min` to `max`, outward-facing triangles.
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        #[rustfmt::skip]
        let vertices = vec![
            x0, y0, z0,  x1, y0, z0,  x1, y1, z0,  x0, y1, z0,
            x0, y0, z1,  x1, y0, z1,  x1, y1, z1,  x0, y1, z1,
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // bottom
            4, 5, 6,  4, 6, 7, // top
            0, 1, 5,  0, 5, 4, // front
            2, 3, 7,  2, 7, 6, // back
            0, 4, 7,  0, 7, 3, // left
            1, 2, 6,  1, 6, 5, // right
        ];
        Self { vertices, indices }
    }
}

/// 3D polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline3 {
    /// Points in order.
    pub points: Vec<[f64; 3]>,
    /// Whether the last point connects back to the first.
    #[serde(default)]
    pub closed: bool,
}

/// Geometry of one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Body geometry.
    Mesh(TriangleMesh),
    /// Curve geometry (axes, annotation symbols, plan symbols).
    Curves {
        /// The curves.
        polylines: Vec<Polyline3>,
    },
}

/// A representation of an element in one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    /// Context this representation belongs to.
    pub context_id: ContextId,
    /// The geometry.
    pub geometry: Geometry,
}

/// A model object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Stable identity.
    pub guid: Guid,
    /// IFC class, e.g. `IfcWall`.
    pub ifc_class: String,
    /// Element name.
    #[serde(default)]
    pub name: Option<String>,
    /// Direct attributes (`Name`, `ObjectType`, `Tag`, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Property sets: pset name → property name → value.
    #[serde(default)]
    pub psets: BTreeMap<String, BTreeMap<String, String>>,
    /// Material assignment.
    #[serde(default)]
    pub material: Option<Material>,
    /// Representations, at most one per context.
    #[serde(default)]
    pub representations: Vec<Representation>,
}

impl Element {
    /// Element with no attributes, material, or geometry.
    pub fn new(guid: impl Into<String>, ifc_class: impl Into<String>) -> Self {
        Self {
            guid: Guid::new(guid),
            ifc_class: ifc_class.into(),
            name: None,
            attributes: BTreeMap::new(),
            psets: BTreeMap::new(),
            material: None,
            representations: Vec::new(),
        }
    }

    /// Add a representation.
    pub fn with_representation(mut self, context_id: ContextId, geometry: Geometry) -> Self {
        self.representations.push(Representation {
            context_id,
            geometry,
        });
        self
    }

    /// Set the material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Set a direct attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set a property.
    pub fn with_property(
        mut self,
        pset: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.psets
            .entry(pset.into())
            .or_default()
            .insert(property.into(), value.into());
        self
    }

    /// First representation whose context is in `group`.
    pub fn representation_in(&self, group: &[ContextId]) -> Option<&Representation> {
        self.representations
            .iter()
            .find(|r| group.contains(&r.context_id))
    }

    /// Resolved material name, `None` when no material is assigned.
    pub fn material_name(&self) -> Option<&str> {
        self.material.as_ref().map(Material::resolved_name)
    }

    /// Look up a value by key.
    ///
    /// `Name` and the class resolve to the element fields, `Pset.Prop` keys
    /// look into property sets, anything else is a direct attribute.
    pub fn value(&self, key: &str) -> Option<&str> {
        match key {
            "Name" if self.name.is_some() => self.name.as_deref(),
            "class" => Some(self.ifc_class.as_str()),
            _ => match key.split_once('.') {
                Some((pset, prop)) => self.pset_value(pset, prop),
                None => self.attributes.get(key).map(String::as_str),
            },
        }
    }

    /// Property value from a named property set.
    pub fn pset_value(&self, pset: &str, property: &str) -> Option<&str> {
        self.psets
            .get(pset)
            .and_then(|props| props.get(property))
            .map(String::as_str)
    }
}

/// What an annotation draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    /// A text label anchored at a point.
    Text {
        /// Anchor in model coordinates.
        position: [f64; 3],
        /// Literal text.
        text: String,
    },
    /// A linear dimension between two points.
    Dimension {
        /// Start point.
        start: [f64; 3],
        /// End point.
        end: [f64; 3],
    },
    /// A free polyline (leader, grid line, break line, ...).
    Polyline {
        /// Points in order.
        points: Vec<[f64; 3]>,
    },
}

/// An annotation belonging to a drawing's group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation element GUID.
    pub guid: Guid,
    /// Paint order, low to high.
    #[serde(default)]
    pub z_index: i32,
    /// Content.
    pub kind: AnnotationKind,
}
