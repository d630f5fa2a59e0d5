//! End-to-end drawing generation.
//!
//! One run resolves contexts, extracts and merges linework, writes the
//! layer documents under `<drawing dir>/cache/`, and composes them into the
//! final SVG. Layer documents from earlier runs are reused when the
//! matching cache flag is set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bimdraw_hlr::{ProjectionEngine, ViewFrame};
use bimdraw_ir::{Drawing, Guid, ModelQuery};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, instrument};

use crate::cache::GeometryStore;
use crate::classify::drawing_metadata_keys;
use crate::config::PipelineConfig;
use crate::error::{DrawError, Result};
use crate::extract::{extract_linework, ExtractOptions, ExtractionReport};
use crate::merge::{merge_linework, min_hole_area, MergeReport};
use crate::resolve::resolve_contexts;
use crate::svg::{
    compose, layer_path, write_annotation, write_linework, write_underlay, DimensionFormat,
    LayerKind, Layers,
};

/// One drawing to generate.
#[derive(Debug, Clone)]
pub struct DrawingRequest<'a> {
    /// Drawing definition.
    pub drawing: &'a Drawing,
    /// Final document path.
    pub output: PathBuf,
    /// Externally rendered underlay raster, if any.
    pub underlay_raster: Option<PathBuf>,
}

impl<'a> DrawingRequest<'a> {
    /// Request without an underlay raster.
    pub fn new(drawing: &'a Drawing, output: impl Into<PathBuf>) -> Self {
        Self {
            drawing,
            output: output.into(),
            underlay_raster: None,
        }
    }

    /// Builder: attach an underlay raster.
    pub fn with_underlay(mut self, raster: impl Into<PathBuf>) -> Self {
        self.underlay_raster = Some(raster.into());
        self
    }
}

/// What a drawing run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawingReport {
    /// Extraction counters; zero when the linework layer was reused.
    pub extraction: ExtractionReport,
    /// Merge counters.
    pub merge: MergeReport,
    /// An underlay layer was written.
    pub underlay: bool,
    /// The linework layer came from a previous run.
    pub linework_reused: bool,
    /// The annotation layer came from a previous run.
    pub annotation_reused: bool,
    /// Annotations written.
    pub annotations: usize,
}

fn build_pool(config: &PipelineConfig) -> Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(config.threads())
        .thread_name(|i| format!("bimdraw-hlr-{i}"))
        .build()?)
}

fn drawing_dir(output: &Path) -> Result<PathBuf> {
    if output.file_name().is_none() {
        return Err(DrawError::OutputPath(output.to_path_buf()));
    }
    Ok(match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

/// Generate one drawing.
///
/// `invalidated` lists elements changed since the last run; their cached
/// projections are discarded. The store is flushed before returning.
pub fn generate_drawing(
    model: &dyn ModelQuery,
    request: &DrawingRequest<'_>,
    invalidated: &HashSet<Guid>,
    engine: &dyn ProjectionEngine,
    store: &mut dyn GeometryStore,
    config: &PipelineConfig,
) -> Result<(PathBuf, DrawingReport)> {
    let pool = build_pool(config)?;
    let result = run(model, request, invalidated, engine, store, config, &pool)?;
    store.flush()?;
    Ok(result)
}

/// Generate several drawings of one model, sharing one store and worker
/// pool. Invalidated elements are evicted once, up front.
pub fn generate_drawings(
    model: &dyn ModelQuery,
    requests: &[DrawingRequest<'_>],
    invalidated: &HashSet<Guid>,
    engine: &dyn ProjectionEngine,
    store: &mut dyn GeometryStore,
    config: &PipelineConfig,
) -> Result<Vec<(PathBuf, DrawingReport)>> {
    let pool = build_pool(config)?;
    let evicted = invalidated.iter().filter(|g| store.evict(g)).count();
    debug!(evicted, "evicted invalidated elements");

    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        results.push(run(model, request, &HashSet::new(), engine, store, config, &pool)?);
    }
    store.flush()?;
    info!(drawings = results.len(), "generated drawings");
    Ok(results)
}

#[instrument(skip_all, fields(drawing = %request.drawing.name))]
fn run(
    model: &dyn ModelQuery,
    request: &DrawingRequest<'_>,
    invalidated: &HashSet<Guid>,
    engine: &dyn ProjectionEngine,
    store: &mut dyn GeometryStore,
    config: &PipelineConfig,
    pool: &ThreadPool,
) -> Result<(PathBuf, DrawingReport)> {
    let drawing = request.drawing;
    let dir = drawing_dir(&request.output)?;
    std::fs::create_dir_all(dir.join("cache"))?;

    let unit = model.length_unit();
    let paper_scale = unit.paper_mm_per_unit(drawing.scale.ratio);
    let frame = ViewFrame::new(&drawing.camera, paper_scale)?;
    let paper = frame.paper_size();
    let camera = model.element(&drawing.camera_guid);
    let mut report = DrawingReport::default();

    let underlay = match (&request.underlay_raster, drawing.style.include_underlay) {
        (Some(raster), true) => {
            let path = layer_path(&dir, &drawing.name, LayerKind::Underlay);
            write_underlay(&path, raster, paper)?;
            report.underlay = true;
            Some(path)
        }
        _ => None,
    };

    let mut extracted = false;
    let linework = if drawing.style.include_linework {
        let path = layer_path(&dir, &drawing.name, LayerKind::Linework);
        if config.use_linework_cache && path.exists() {
            debug!(path = %path.display(), "reusing linework layer");
            report.linework_reused = true;
            Some(path)
        } else {
            let plan = resolve_contexts(drawing.target_view, model.contexts());
            if plan.is_empty() {
                info!("no representation contexts apply, skipping linework");
                None
            } else {
                let keys = drawing_metadata_keys(
                    camera,
                    &config.metadata_pset,
                    &config.default_metadata_keys,
                );
                let options = ExtractOptions {
                    pool,
                    paper_scale,
                    metadata_keys: &keys,
                };
                let linework =
                    extract_linework(model, drawing, &plan, invalidated, engine, store, &options)?;
                extracted = true;
                report.extraction = linework.report;

                let min_area = min_hole_area(unit, &drawing.scale, config.merge.hole_tolerance);
                let (fragments, merge) = merge_linework(linework.fragments, &config.merge, min_area);
                report.merge = merge;

                write_linework(&path, &fragments, paper, config.coordinate_precision)?;
                Some(path)
            }
        }
    } else {
        None
    };
    if !extracted {
        for guid in invalidated {
            store.evict(guid);
        }
    }

    let annotation = if drawing.style.include_annotation {
        let path = layer_path(&dir, &drawing.name, LayerKind::Annotation);
        if config.use_annotation_cache && path.exists() {
            debug!(path = %path.display(), "reusing annotation layer");
            report.annotation_reused = true;
        } else {
            let annotations: Vec<_> = model
                .annotations(drawing)
                .into_iter()
                .filter(|a| {
                    drawing
                        .include
                        .as_ref()
                        .map_or(true, |include| include.contains(&a.guid))
                })
                .collect();
            let format =
                DimensionFormat::from_camera(camera, &config.metadata_pset, config.default_decimal_places);
            write_annotation(&path, &annotations, &frame, &format, config.coordinate_precision)?;
            report.annotations = annotations.len();
        }
        Some(path)
    } else {
        None
    };

    let layers = Layers {
        underlay: underlay.as_deref(),
        linework: linework.as_deref(),
        annotation: annotation.as_deref(),
    };
    let output = compose(&layers, &request.output, paper, drawing.style.stylesheet.as_deref())?;

    info!(
        output = %output.display(),
        fragments = report.extraction.fragments,
        merged = report.merge.merged,
        hits = report.extraction.cache_hits,
        misses = report.extraction.cache_misses,
        "generated drawing"
    );
    Ok((output, report))
}
