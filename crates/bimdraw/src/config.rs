//! Pipeline configuration, loadable from TOML.
//!
//! ```toml
//! data_dir = "/var/lib/bimdraw"
//! use_linework_cache = true
//! worker_threads = 4
//! default_metadata_keys = ["Tag", "Pset_WallCommon.FireRating"]
//!
//! [merge]
//! hole_tolerance = 0.05
//!
//! [hlr]
//! sharp_angle = 20.0
//! ```
//!
//! The `[hlr]` section configures the engine built by
//! [`PipelineConfig::engine`].

use std::path::{Path, PathBuf};

use bimdraw_hlr::{HlrEngine, HlrSettings};
use bimdraw_ir::DRAWING_PSET;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Polygon merge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Merge same-material cut rings at all.
    pub enabled: bool,
    /// Decimal places (paper millimetres) used when deciding whether a
    /// path is a closed ring, and for merged output coordinates.
    pub ring_precision: u32,
    /// Real-world linear tolerance in metres. Holes smaller than its
    /// square (converted to paper) are purged.
    pub hole_tolerance: f64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ring_precision: 1,
            hole_tolerance: 0.03,
        }
    }
}

/// Everything the pipeline needs besides the model and the drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root for persistent data; the geometry cache lives in `<data_dir>/cache`.
    pub data_dir: PathBuf,
    /// Reuse an existing `cache/<drawing>-linework.svg` instead of extracting.
    pub use_linework_cache: bool,
    /// Reuse an existing `cache/<drawing>-annotation.svg`.
    pub use_annotation_cache: bool,
    /// Projection workers; `None` uses every core.
    pub worker_threads: Option<usize>,
    /// Property set on the camera element holding drawing metadata.
    pub metadata_pset: String,
    /// Metadata keys used when the camera does not list its own.
    pub default_metadata_keys: Vec<String>,
    /// Decimal places for path coordinates in layer documents.
    pub coordinate_precision: usize,
    /// Decimal places for dimension labels when the camera sets none.
    pub default_decimal_places: usize,
    /// Polygon merge settings.
    pub merge: MergeSettings,
    /// Hidden-line engine settings.
    pub hlr: HlrSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".bimdraw"),
            use_linework_cache: false,
            use_annotation_cache: false,
            worker_threads: None,
            metadata_pset: DRAWING_PSET.to_string(),
            default_metadata_keys: Vec::new(),
            coordinate_precision: 4,
            default_decimal_places: 2,
            merge: MergeSettings::default(),
            hlr: HlrSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Hidden-line engine built from the `[hlr]` section.
    pub fn engine(&self) -> Result<HlrEngine> {
        Ok(HlrEngine::new(self.hlr.clone())?)
    }

    /// Worker count actually used.
    pub fn threads(&self) -> usize {
        self.worker_threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}
