//! Context resolution: which representation contexts feed a drawing, in
//! what order.

use bimdraw_ir::{ContextId, ContextType, RepresentationContext, TargetView};
use tracing::debug;

/// Priority-ordered context groups for body and annotation geometry.
///
/// Groups may be empty; the extractor skips them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPlan {
    /// Body groups, highest priority first.
    pub body: Vec<Vec<ContextId>>,
    /// Annotation groups, highest priority first.
    pub annotation: Vec<Vec<ContextId>>,
}

impl ContextPlan {
    /// True when no group holds any context: nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.body.iter().chain(&self.annotation).all(Vec::is_empty)
    }
}

#[derive(Default)]
struct Buckets {
    plan_body_target: Vec<ContextId>,
    plan_body_model: Vec<ContextId>,
    model_body_target: Vec<ContextId>,
    model_body_model: Vec<ContextId>,
    plan_annotation_target: Vec<ContextId>,
    plan_annotation_model: Vec<ContextId>,
    model_annotation_target: Vec<ContextId>,
    model_annotation_model: Vec<ContextId>,
}

#[derive(Clone, Copy)]
enum Content {
    Body,
    Annotation,
}

#[derive(Clone, Copy)]
enum Match {
    Target,
    ModelView,
}

impl Buckets {
    fn bucket(&mut self, ty: ContextType, content: Content, m: Match) -> Option<&mut Vec<ContextId>> {
        let bucket = match (ty, content, m) {
            (ContextType::Plan, Content::Body, Match::Target) => &mut self.plan_body_target,
            (ContextType::Plan, Content::Body, Match::ModelView) => &mut self.plan_body_model,
            (ContextType::Model, Content::Body, Match::Target) => &mut self.model_body_target,
            (ContextType::Model, Content::Body, Match::ModelView) => &mut self.model_body_model,
            (ContextType::Plan, Content::Annotation, Match::Target) => {
                &mut self.plan_annotation_target
            }
            (ContextType::Plan, Content::Annotation, Match::ModelView) => {
                &mut self.plan_annotation_model
            }
            (ContextType::Model, Content::Annotation, Match::Target) => {
                &mut self.model_annotation_target
            }
            (ContextType::Model, Content::Annotation, Match::ModelView) => {
                &mut self.model_annotation_model
            }
            (ContextType::Other, _, _) => return None,
        };
        Some(bucket)
    }
}

/// Classify `contexts` for a drawing with the given target view.
///
/// Sub-contexts land in one of eight buckets by type, content, and whether
/// their target view matches exactly or is the `MODEL_VIEW` fallback. A
/// plain `Model` context is treated as a fallback model body context.
/// Plan buckets only apply to plan and reflected plan views.
pub fn resolve_contexts(target_view: TargetView, contexts: &[RepresentationContext]) -> ContextPlan {
    let mut buckets = Buckets::default();

    for context in contexts {
        if !context.is_sub_context {
            if context.context_type == ContextType::Model {
                buckets.model_body_model.push(context.id);
            }
            continue;
        }

        let content = match context.identifier {
            Some(ident) if ident.is_body() => Content::Body,
            Some(bimdraw_ir::ContextIdentifier::Annotation) => Content::Annotation,
            _ => continue,
        };
        let matched = match context.target_view {
            Some(tv) if tv == target_view && tv != TargetView::Other => Match::Target,
            Some(TargetView::ModelView) => Match::ModelView,
            _ => continue,
        };
        if let Some(bucket) = buckets.bucket(context.context_type, content, matched) {
            bucket.push(context.id);
        }
    }

    let b = buckets;
    let plan = if target_view.is_plan() {
        ContextPlan {
            body: vec![
                b.plan_body_target,
                b.plan_body_model,
                b.model_body_target,
                b.model_body_model,
            ],
            annotation: vec![
                b.plan_annotation_target,
                b.plan_annotation_model,
                b.model_annotation_target,
                b.model_annotation_model,
            ],
        }
    } else {
        ContextPlan {
            body: vec![b.model_body_target, b.model_body_model],
            annotation: vec![b.model_annotation_target, b.model_annotation_model],
        }
    };

    debug!(
        ?target_view,
        body = ?plan.body,
        annotation = ?plan.annotation,
        "resolved contexts"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimdraw_ir::ContextIdentifier::{Annotation, Body, Facetation};

    fn contexts() -> Vec<RepresentationContext> {
        vec![
            RepresentationContext::root(1, ContextType::Model),
            RepresentationContext::root(2, ContextType::Plan),
            RepresentationContext::sub(10, ContextType::Plan, Body, TargetView::PlanView),
            RepresentationContext::sub(11, ContextType::Plan, Facetation, TargetView::ModelView),
            RepresentationContext::sub(12, ContextType::Model, Body, TargetView::ModelView),
            RepresentationContext::sub(13, ContextType::Model, Body, TargetView::SectionView),
            RepresentationContext::sub(14, ContextType::Plan, Annotation, TargetView::PlanView),
            RepresentationContext::sub(15, ContextType::Model, Annotation, TargetView::SectionView),
            RepresentationContext::sub(16, ContextType::Model, Annotation, TargetView::ModelView),
            RepresentationContext::sub(
                17,
                ContextType::Model,
                bimdraw_ir::ContextIdentifier::Other,
                TargetView::ModelView,
            ),
            RepresentationContext::sub(18, ContextType::Model, Body, TargetView::Other),
        ]
    }

    fn ids(v: &[u64]) -> Vec<ContextId> {
        v.iter().copied().map(ContextId).collect()
    }

    #[test]
    fn test_plan_view_priority() {
        let plan = resolve_contexts(TargetView::PlanView, &contexts());
        assert_eq!(
            plan.body,
            vec![ids(&[10]), ids(&[11]), ids(&[]), ids(&[1, 12])]
        );
        assert_eq!(
            plan.annotation,
            vec![ids(&[14]), ids(&[]), ids(&[]), ids(&[16])]
        );
    }

    #[test]
    fn test_section_view_skips_plan_contexts() {
        let plan = resolve_contexts(TargetView::SectionView, &contexts());
        assert_eq!(plan.body, vec![ids(&[13]), ids(&[1, 12])]);
        assert_eq!(plan.annotation, vec![ids(&[15]), ids(&[16])]);
    }

    #[test]
    fn test_reflected_plan_uses_plan_buckets() {
        let plan = resolve_contexts(TargetView::ReflectedPlanView, &contexts());
        assert_eq!(plan.body.len(), 4);
        assert_eq!(plan.body[0], ids(&[]));
        assert_eq!(plan.body[1], ids(&[11]));
    }

    #[test]
    fn test_other_target_view_never_matches() {
        let plan = resolve_contexts(TargetView::Other, &contexts());
        assert_eq!(plan.body, vec![ids(&[]), ids(&[1, 12])]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = resolve_contexts(TargetView::PlanView, &[]);
        assert!(plan.is_empty());
        assert_eq!(plan.body.len(), 4);
    }
}
