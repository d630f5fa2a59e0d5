//! Geometric representation contexts.

use serde::{Deserialize, Serialize};

use crate::drawing::TargetView;

/// Identifier of a representation context within one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Context type (`ContextType` in IFC terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextType {
    /// 2D plan drafting context.
    Plan,
    /// 3D model context.
    Model,
    /// Anything else (e.g. `NotDefined`).
    #[serde(other)]
    Other,
}

/// What the context's representations contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextIdentifier {
    /// Solid body geometry.
    Body,
    /// Faceted body geometry.
    Facetation,
    /// Annotation curves and symbols.
    Annotation,
    /// Axis, box, footprint, ...
    #[serde(other)]
    Other,
}

impl ContextIdentifier {
    /// Whether representations in this context carry body-like geometry.
    pub fn is_body(self) -> bool {
        matches!(self, ContextIdentifier::Body | ContextIdentifier::Facetation)
    }
}

/// A geometric representation context of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationContext {
    /// Context id, referenced by representations.
    pub id: ContextId,
    /// Plan or model.
    pub context_type: ContextType,
    /// Content identifier, only set on sub-contexts.
    #[serde(default)]
    pub identifier: Option<ContextIdentifier>,
    /// Target view tag, only set on sub-contexts.
    #[serde(default)]
    pub target_view: Option<TargetView>,
    /// Sub-contexts refine a parent context with identifier and target view.
    #[serde(default)]
    pub is_sub_context: bool,
}

impl RepresentationContext {
    /// Top-level context without refinement.
    pub fn root(id: u64, context_type: ContextType) -> Self {
        Self {
            id: ContextId(id),
            context_type,
            identifier: None,
            target_view: None,
            is_sub_context: false,
        }
    }

    /// Sub-context with identifier and target view.
    pub fn sub(
        id: u64,
        context_type: ContextType,
        identifier: ContextIdentifier,
        target_view: TargetView,
    ) -> Self {
        Self {
            id: ContextId(id),
            context_type,
            identifier: Some(identifier),
            target_view: Some(target_view),
            is_sub_context: true,
        }
    }
}
