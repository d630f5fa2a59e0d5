//! Linework extraction: drive the projection engine over prioritised
//! context groups, consuming and populating the geometry cache.

use std::collections::{HashSet, VecDeque};

use bimdraw_hlr::{PathKind, ProjectedPath, ProjectionEngine, ViewFrame};
use bimdraw_ir::{ContextId, Drawing, Element, Geometry, Guid, ModelQuery};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, instrument, warn};

use crate::cache::{fingerprint, CacheEntry, GeometryStore};
use crate::classify;
use crate::error::Result;
use crate::resolve::ContextPlan;

/// Tagged paths drawn for one element, or for several once merged.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFragment {
    /// Element GUIDs. One for extracted fragments, every contributor for
    /// merged ones.
    pub guids: Vec<Guid>,
    /// Ordered classification tags.
    pub classes: Vec<String>,
    /// Canonical material token, if the element has a material.
    pub material: Option<String>,
    /// Paper-space paths.
    pub paths: Vec<ProjectedPath>,
    /// Produced by the polygon merger.
    pub merged: bool,
    /// The drawing's camera; always drawn last.
    pub camera: bool,
}

impl VectorFragment {
    /// The (first) element GUID.
    pub fn guid(&self) -> Option<&Guid> {
        self.guids.first()
    }

    /// Whether any cut path forms a closed ring.
    pub fn has_closed_ring(&self) -> bool {
        self.paths
            .iter()
            .any(|p| p.kind == PathKind::Cut && p.closed)
    }
}

/// Counters from one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Fragments produced, the camera included.
    pub fragments: usize,
    /// Projections reused from the cache.
    pub cache_hits: usize,
    /// Projections computed.
    pub cache_misses: usize,
    /// Cache entries evicted for invalidated elements.
    pub evicted: usize,
    /// Projection failures; the element stays unresolved.
    pub skipped: usize,
    /// Elements left without body linework.
    pub unresolved: usize,
}

/// Extraction output.
#[derive(Debug, Clone, Default)]
pub struct Linework {
    /// Fragments in serialisation order; the camera is last.
    pub fragments: Vec<VectorFragment>,
    /// Counters.
    pub report: ExtractionReport,
}

/// Inputs shared by both extraction passes.
pub struct ExtractOptions<'a> {
    /// Projection workers.
    pub pool: &'a ThreadPool,
    /// Paper millimetres per model unit.
    pub paper_scale: f64,
    /// Metadata keys turned into classification tags.
    pub metadata_keys: &'a [String],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pass {
    Body,
    Annotation,
}

/// A unit of projection work.
struct Job<'m> {
    element: &'m Element,
    geometry: &'m Geometry,
    fingerprint: String,
    cached: Option<Vec<ProjectedPath>>,
}

/// How a job's paths were obtained.
enum Outcome {
    Hit(Vec<ProjectedPath>),
    Projected(bimdraw_hlr::Result<Vec<ProjectedPath>>),
}

/// Lazy, single-pass stream over one context group.
///
/// Jobs are projected in chunks as wide as the pool, in parallel; results
/// come out in job order. Cache hits are passed through without touching
/// the engine.
struct BucketStream<'a, 'm> {
    jobs: std::vec::IntoIter<Job<'m>>,
    ready: VecDeque<(Job<'m>, Outcome)>,
    pool: &'a ThreadPool,
    engine: &'a dyn ProjectionEngine,
    frame: &'a ViewFrame,
}

impl<'a, 'm> BucketStream<'a, 'm> {
    fn new(
        jobs: Vec<Job<'m>>,
        pool: &'a ThreadPool,
        engine: &'a dyn ProjectionEngine,
        frame: &'a ViewFrame,
    ) -> Self {
        Self {
            jobs: jobs.into_iter(),
            ready: VecDeque::new(),
            pool,
            engine,
            frame,
        }
    }

    fn refill(&mut self) {
        let width = self.pool.current_num_threads().max(1);
        let chunk: Vec<Job<'m>> = self.jobs.by_ref().take(width).collect();
        if chunk.is_empty() {
            return;
        }
        let (engine, frame) = (self.engine, self.frame);
        let results: Vec<(Job<'m>, Outcome)> = self.pool.install(|| {
            chunk
                .into_par_iter()
                .map(|mut job| {
                    let outcome = match job.cached.take() {
                        Some(paths) => Outcome::Hit(paths),
                        None => Outcome::Projected(engine.project(job.geometry, frame)),
                    };
                    (job, outcome)
                })
                .collect()
        });
        self.ready.extend(results);
    }
}

impl<'m> Iterator for BucketStream<'_, 'm> {
    type Item = (Job<'m>, Outcome);

    fn next(&mut self) -> Option<Self::Item> {
        if self.ready.is_empty() {
            self.refill();
        }
        self.ready.pop_front()
    }
}

/// Extract linework for `drawing`.
///
/// Invalidated GUIDs are evicted from `store` first. The body pass and the
/// annotation pass each walk their context groups in priority order, and an
/// element resolved by one group is not offered to later groups of the same
/// pass. The camera element is always serialised last.
#[instrument(skip_all, fields(drawing = %drawing.name))]
pub fn extract_linework(
    model: &dyn ModelQuery,
    drawing: &Drawing,
    plan: &ContextPlan,
    invalidated: &HashSet<Guid>,
    engine: &dyn ProjectionEngine,
    store: &mut dyn GeometryStore,
    options: &ExtractOptions<'_>,
) -> Result<Linework> {
    let frame = ViewFrame::new(&drawing.camera, options.paper_scale)?;
    let mut linework = Linework::default();

    for guid in invalidated {
        if store.evict(guid) {
            linework.report.evicted += 1;
        }
    }

    let drawing_elements: Vec<&Element> = model
        .drawing_elements(drawing)
        .into_iter()
        .filter(|e| e.guid != drawing.camera_guid)
        .collect();

    let camera_fp = serde_json::to_string(&drawing.camera).unwrap_or_default();
    let scale_fp = options.paper_scale.to_string();
    let engine_fp = engine.fingerprint();

    for (pass, groups) in [(Pass::Body, &plan.body), (Pass::Annotation, &plan.annotation)] {
        let mut working = drawing_elements.clone();
        for group in groups {
            if working.is_empty() {
                break;
            }
            if group.is_empty() {
                continue;
            }
            let group_fp = group
                .iter()
                .map(ContextId::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let jobs: Vec<Job<'_>> = working
                .iter()
                .copied()
                .filter_map(|element| {
                    let rep = element.representation_in(group)?;
                    let fp = fingerprint(&[
                        rep.context_id.to_string().as_str(),
                        camera_fp.as_str(),
                        scale_fp.as_str(),
                        engine_fp.as_str(),
                    ]);
                    let cached = store.get(&element.guid, &fp);
                    Some(Job {
                        element,
                        geometry: &rep.geometry,
                        fingerprint: fp,
                        cached,
                    })
                })
                .collect();

            let mut resolved = HashSet::new();
            for (job, outcome) in BucketStream::new(jobs, options.pool, engine, &frame) {
                let paths = match outcome {
                    Outcome::Hit(paths) => {
                        linework.report.cache_hits += 1;
                        paths
                    }
                    Outcome::Projected(Ok(paths)) => {
                        linework.report.cache_misses += 1;
                        store.put(
                            job.element.guid.clone(),
                            CacheEntry {
                                fingerprint: job.fingerprint,
                                paths: paths.clone(),
                            },
                        );
                        paths
                    }
                    Outcome::Projected(Err(e)) => {
                        warn!(guid = %job.element.guid, error = %e, "projection failed, skipping element");
                        linework.report.skipped += 1;
                        continue;
                    }
                };
                linework
                    .fragments
                    .push(fragment(job.element, pass, paths, options.metadata_keys));
                resolved.insert(job.element.guid.clone());
            }

            debug!(?pass, group = %group_fp, resolved = resolved.len(), "processed context group");
            working.retain(|e| !resolved.contains(&e.guid));
        }
        if pass == Pass::Body {
            linework.report.unresolved += working.len();
        }
    }

    linework
        .fragments
        .push(camera_fragment(model, drawing, engine, &frame, options.metadata_keys));
    linework.report.fragments = linework.fragments.len();

    info!(
        fragments = linework.report.fragments,
        hits = linework.report.cache_hits,
        misses = linework.report.cache_misses,
        skipped = linework.report.skipped,
        unresolved = linework.report.unresolved,
        "extracted linework"
    );
    Ok(linework)
}

fn fragment(
    element: &Element,
    pass: Pass,
    mut paths: Vec<ProjectedPath>,
    metadata_keys: &[String],
) -> VectorFragment {
    let kind = match pass {
        Pass::Annotation => {
            for path in &mut paths {
                path.kind = PathKind::Annotation;
            }
            PathKind::Annotation
        }
        Pass::Body if paths.iter().any(|p| p.kind == PathKind::Cut) => PathKind::Cut,
        Pass::Body => PathKind::Projection,
    };
    VectorFragment {
        guids: vec![element.guid.clone()],
        classes: classify::classes(kind.as_class(), element, metadata_keys),
        material: classify::material_token(element),
        paths,
        merged: false,
        camera: false,
    }
}

/// The camera's own fragment: its first representation, or an empty group.
fn camera_fragment(
    model: &dyn ModelQuery,
    drawing: &Drawing,
    engine: &dyn ProjectionEngine,
    frame: &ViewFrame,
    metadata_keys: &[String],
) -> VectorFragment {
    let Some(camera) = model.element(&drawing.camera_guid) else {
        warn!(guid = %drawing.camera_guid, "camera element missing from model");
        return VectorFragment {
            guids: vec![drawing.camera_guid.clone()],
            classes: vec![PathKind::Projection.as_class().to_string()],
            material: None,
            paths: Vec::new(),
            merged: false,
            camera: true,
        };
    };
    let paths = camera
        .representations
        .first()
        .map(|rep| match engine.project(&rep.geometry, frame) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(guid = %camera.guid, error = %e, "camera projection failed");
                Vec::new()
            }
        })
        .unwrap_or_default();
    VectorFragment {
        camera: true,
        ..fragment(camera, Pass::Body, paths, metadata_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::resolve::resolve_contexts;
    use bimdraw_hlr::HlrEngine;
    use bimdraw_ir::{
        Camera, ContextIdentifier, ContextType, DrawingScale, DrawingStyle, InMemoryModel,
        LengthUnit, Material, RepresentationContext, TargetView, TriangleMesh,
    };

    fn drawing() -> Drawing {
        Drawing {
            id: 1,
            name: "GROUND FLOOR".into(),
            camera_guid: Guid::from("cam"),
            target_view: TargetView::PlanView,
            scale: DrawingScale::default(),
            style: DrawingStyle::default(),
            camera: Camera::plan([5.0, 5.0, 1.0], 10.0, 10.0),
            include: None,
        }
    }

    fn model() -> InMemoryModel {
        let mut m = InMemoryModel::new("/tmp/extract.ifc", LengthUnit::default());
        m.add_context(RepresentationContext::root(1, ContextType::Model));
        m.add_context(RepresentationContext::sub(
            2,
            ContextType::Plan,
            ContextIdentifier::Body,
            TargetView::PlanView,
        ));
        let wall = |guid: &str, x: f64| {
            Element::new(guid, "IfcWall")
                .with_material(Material::Single {
                    name: Some("Concrete".into()),
                })
                .with_representation(
                    ContextId(1),
                    Geometry::Mesh(TriangleMesh::cuboid([x, 1.0, 0.0], [x + 1.0, 2.0, 3.0])),
                )
        };
        m.add_element(wall("a", 1.0)).unwrap();
        m.add_element(wall("b", 3.0).with_representation(
            ContextId(2),
            Geometry::Mesh(TriangleMesh::cuboid([3.0, 1.0, 0.0], [4.0, 2.0, 0.5])),
        ))
        .unwrap();
        m.add_element(Element::new("orphan", "IfcFurniture")).unwrap();
        m.add_element(Element::new("cam", "IfcAnnotation")).unwrap();
        m
    }

    fn run(store: &mut dyn GeometryStore, invalidated: &HashSet<Guid>) -> Linework {
        let model = model();
        let drawing = drawing();
        let plan = resolve_contexts(drawing.target_view, model.contexts());
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let options = ExtractOptions {
            pool: &pool,
            paper_scale: 10.0,
            metadata_keys: &[],
        };
        extract_linework(
            &model,
            &drawing,
            &plan,
            invalidated,
            &HlrEngine::default(),
            store,
            &options,
        )
        .unwrap()
    }

    #[test]
    fn test_priority_and_camera_last() {
        let mut store = MemoryStore::new();
        let linework = run(&mut store, &HashSet::new());

        let guids: Vec<_> = linework
            .fragments
            .iter()
            .map(|f| f.guid().unwrap().as_str())
            .collect();
        // b resolves through the plan context first, a through the model fallback
        assert_eq!(guids, vec!["b", "a", "cam"]);
        assert_eq!(linework.report.unresolved, 1); // orphan
        assert_eq!(linework.report.cache_misses, 2);

        // The plan representation of b sits below the cut: projection only
        assert_eq!(linework.fragments[0].classes[0], "projection");
        assert_eq!(linework.fragments[1].classes, vec!["cut", "material-Concrete"]);
        assert!(linework.fragments[1].has_closed_ring());
        assert!(linework.fragments[2].paths.is_empty());
        assert!(linework.fragments[2].camera);
        assert!(!linework.fragments[0].camera && !linework.fragments[1].camera);
    }

    #[test]
    fn test_second_run_hits_cache() {
        let mut store = MemoryStore::new();
        let first = run(&mut store, &HashSet::new());
        let second = run(&mut store, &HashSet::new());
        assert_eq!(second.report.cache_hits, 2);
        assert_eq!(second.report.cache_misses, 0);
        assert_eq!(first.fragments, second.fragments);
    }

    #[test]
    fn test_invalidated_element_is_recomputed() {
        let mut store = MemoryStore::new();
        run(&mut store, &HashSet::new());
        let invalidated: HashSet<Guid> = [Guid::from("a")].into_iter().collect();
        let linework = run(&mut store, &invalidated);
        assert_eq!(linework.report.evicted, 1);
        assert_eq!(linework.report.cache_misses, 1);
        assert_eq!(linework.report.cache_hits, 1);
    }
}
