//! Read-only model query interface and an in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::RepresentationContext;
use crate::drawing::Drawing;
use crate::element::{Annotation, Element, Guid};
use crate::error::{IrError, Result};
use crate::units::LengthUnit;

/// What the drawing pipeline needs to know about a model.
///
/// Implementations must be shareable across projection workers.
pub trait ModelQuery: Sync {
    /// Path of the source model file; keys the persistent geometry cache.
    fn source_path(&self) -> &Path;

    /// Project length unit.
    fn length_unit(&self) -> LengthUnit;

    /// All representation contexts.
    fn contexts(&self) -> &[RepresentationContext];

    /// Element by GUID.
    fn element(&self, guid: &Guid) -> Option<&Element>;

    /// Elements a drawing shows, in model order. Always contains the camera
    /// element when it exists in the model.
    fn drawing_elements(&self, drawing: &Drawing) -> Vec<&Element>;

    /// Annotations in the drawing's group, in model order.
    fn annotations(&self, drawing: &Drawing) -> Vec<&Annotation>;
}

/// A model held entirely in memory, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryModel {
    /// Source file path.
    #[serde(default)]
    pub source_path: PathBuf,
    /// Project length unit.
    #[serde(default)]
    pub length_unit: LengthUnit,
    /// Representation contexts.
    #[serde(default)]
    pub contexts: Vec<RepresentationContext>,
    #[serde(default)]
    elements: Vec<Element>,
    /// Drawing id → annotations of that drawing's group.
    #[serde(default)]
    annotations: BTreeMap<u64, Vec<Annotation>>,
    #[serde(skip)]
    index: HashMap<Guid, usize>,
}

impl InMemoryModel {
    /// Empty model.
    pub fn new(source_path: impl Into<PathBuf>, length_unit: LengthUnit) -> Self {
        Self {
            source_path: source_path.into(),
            length_unit,
            ..Default::default()
        }
    }

    /// Parse a model from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut model: Self = serde_json::from_str(json)?;
        model.rebuild_index()?;
        Ok(model)
    }

    /// Load a model from a JSON file. The file path becomes the source path
    /// unless the document names one.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut model = Self::from_json_str(&text)?;
        if model.source_path.as_os_str().is_empty() {
            model.source_path = path.to_path_buf();
        }
        Ok(model)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a representation context.
    pub fn add_context(&mut self, context: RepresentationContext) {
        self.contexts.push(context);
    }

    /// Add an element. GUIDs must be unique.
    pub fn add_element(&mut self, element: Element) -> Result<()> {
        if self.index.contains_key(&element.guid) {
            return Err(IrError::DuplicateGuid(element.guid));
        }
        self.index.insert(element.guid.clone(), self.elements.len());
        self.elements.push(element);
        Ok(())
    }

    /// Replace an element with the same GUID, or add it.
    pub fn upsert_element(&mut self, element: Element) {
        match self.index.get(&element.guid) {
            Some(&i) => self.elements[i] = element,
            None => {
                self.index.insert(element.guid.clone(), self.elements.len());
                self.elements.push(element);
            }
        }
    }

    /// Attach an annotation to a drawing's group.
    pub fn add_annotation(&mut self, drawing_id: u64, annotation: Annotation) {
        self.annotations.entry(drawing_id).or_default().push(annotation);
    }

    /// All elements in model order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        for (i, element) in self.elements.iter().enumerate() {
            if self.index.insert(element.guid.clone(), i).is_some() {
                return Err(IrError::DuplicateGuid(element.guid.clone()));
            }
        }
        Ok(())
    }
}

impl ModelQuery for InMemoryModel {
    fn source_path(&self) -> &Path {
        &self.source_path
    }

    fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }

    fn contexts(&self) -> &[RepresentationContext] {
        &self.contexts
    }

    fn element(&self, guid: &Guid) -> Option<&Element> {
        self.index.get(guid).map(|&i| &self.elements[i])
    }

    fn drawing_elements(&self, drawing: &Drawing) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| match &drawing.include {
                Some(include) => e.guid == drawing.camera_guid || include.contains(&e.guid),
                None => true,
            })
            .collect()
    }

    fn annotations(&self, drawing: &Drawing) -> Vec<&Annotation> {
        self.annotations
            .get(&drawing.id)
            .map(|a| a.iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Camera, ContextType, DrawingScale, DrawingStyle, TargetView};

    fn drawing(include: Option<Vec<Guid>>) -> Drawing {
        Drawing {
            id: 7,
            name: "PLAN".into(),
            camera_guid: Guid::from("cam"),
            target_view: TargetView::PlanView,
            scale: DrawingScale::default(),
            style: DrawingStyle::default(),
            camera: Camera::plan([0.0, 0.0, 1.0], 10.0, 10.0),
            include,
        }
    }

    fn model() -> InMemoryModel {
        let mut m = InMemoryModel::new("/tmp/house.ifc", LengthUnit::default());
        m.add_context(RepresentationContext::root(1, ContextType::Model));
        m.add_element(Element::new("a", "IfcWall")).unwrap();
        m.add_element(Element::new("b", "IfcSlab")).unwrap();
        m.add_element(Element::new("cam", "IfcAnnotation")).unwrap();
        m
    }

    #[test]
    fn test_duplicate_guid_rejected() {
        let mut m = model();
        let err = m.add_element(Element::new("a", "IfcDoor")).unwrap_err();
        assert!(matches!(err, IrError::DuplicateGuid(g) if g.as_str() == "a"));
    }

    #[test]
    fn test_drawing_elements_filter_keeps_camera() {
        let m = model();
        let all = m.drawing_elements(&drawing(None));
        assert_eq!(all.len(), 3);

        let filtered = m.drawing_elements(&drawing(Some(vec![Guid::from("b")])));
        let guids: Vec<_> = filtered.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["b", "cam"]);
    }

    #[test]
    fn test_json_roundtrip_rebuilds_index() {
        let mut m = model();
        m.add_annotation(
            7,
            Annotation {
                guid: Guid::from("t1"),
                z_index: 2,
                kind: crate::AnnotationKind::Text {
                    position: [0.0; 3],
                    text: "LOBBY".into(),
                },
            },
        );
        let json = m.to_json().unwrap();
        let loaded = InMemoryModel::from_json_str(&json).unwrap();
        assert!(loaded.element(&Guid::from("b")).is_some());
        assert_eq!(loaded.annotations(&drawing(None)).len(), 1);
        assert_eq!(loaded.source_path, PathBuf::from("/tmp/house.ifc"));
    }

    #[test]
    fn test_from_json_file_sets_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"elements":[{"guid":"x","ifc_class":"IfcWall"}]}"#).unwrap();
        let m = InMemoryModel::from_json_file(&path).unwrap();
        assert_eq!(m.source_path(), path.as_path());
        assert_eq!(m.elements().len(), 1);
    }
}
