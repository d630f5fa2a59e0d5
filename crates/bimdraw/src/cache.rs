//! Geometry cache: element GUID → previously projected paths.
//!
//! Each entry remembers the settings fingerprint it was computed under
//! (context, camera, paper scale, engine settings). A lookup only hits when
//! the fingerprint matches, so an element may hold a few entries at once,
//! for example one per drawing it appears in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bimdraw_hlr::ProjectedPath;
use bimdraw_ir::Guid;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DrawError, Result};

/// Entries kept per element; the oldest is dropped beyond this.
pub const MAX_ENTRIES_PER_ELEMENT: usize = 8;

/// Projected geometry of one element under one set of settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Settings fingerprint.
    pub fingerprint: String,
    /// Engine output.
    pub paths: Vec<ProjectedPath>,
}

/// Keyed store consulted and updated by the extractor.
///
/// Only the extraction consumer touches the store, so implementations need
/// no interior locking.
pub trait GeometryStore: Send {
    /// Cached paths for `guid` computed under `fingerprint`.
    fn get(&self, guid: &Guid, fingerprint: &str) -> Option<Vec<ProjectedPath>>;

    /// Insert or replace the entry with the same fingerprint.
    fn put(&mut self, guid: Guid, entry: CacheEntry);

    /// Drop every entry for `guid`. Returns whether anything was removed.
    fn evict(&mut self, guid: &Guid) -> bool;

    /// Persist pending changes.
    fn flush(&mut self) -> Result<()>;

    /// Number of elements with at least one entry.
    fn len(&self) -> usize;

    /// Whether the store holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the fingerprint for a projection.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex()[..16].to_string()
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Entries {
    #[serde(default)]
    elements: BTreeMap<Guid, Vec<CacheEntry>>,
}

impl Entries {
    fn get(&self, guid: &Guid, fingerprint: &str) -> Option<Vec<ProjectedPath>> {
        self.elements
            .get(guid)?
            .iter()
            .find(|e| e.fingerprint == fingerprint)
            .map(|e| e.paths.clone())
    }

    fn put(&mut self, guid: Guid, entry: CacheEntry) {
        let entries = self.elements.entry(guid).or_default();
        entries.retain(|e| e.fingerprint != entry.fingerprint);
        entries.push(entry);
        if entries.len() > MAX_ENTRIES_PER_ELEMENT {
            let excess = entries.len() - MAX_ENTRIES_PER_ELEMENT;
            entries.drain(..excess);
        }
    }

    fn evict(&mut self, guid: &Guid) -> bool {
        self.elements.remove(guid).is_some()
    }
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Entries,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeometryStore for MemoryStore {
    fn get(&self, guid: &Guid, fingerprint: &str) -> Option<Vec<ProjectedPath>> {
        self.entries.get(guid, fingerprint)
    }

    fn put(&mut self, guid: Guid, entry: CacheEntry) {
        self.entries.put(guid, entry);
    }

    fn evict(&mut self, guid: &Guid) -> bool {
        self.entries.evict(guid)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.elements.len()
    }
}

/// One JSON file per source model under `<data_dir>/cache/`.
///
/// The file name is the blake3 hash of the model path. An unreadable or
/// corrupt file is logged and treated as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Entries,
    dirty: bool,
}

impl FileStore {
    /// Cache file location for a model.
    pub fn path_for(data_dir: &Path, model_path: &Path) -> PathBuf {
        let hash = blake3::hash(model_path.to_string_lossy().as_bytes());
        data_dir.join("cache").join(format!("{}.json", hash.to_hex()))
    }

    /// Open the store for `model_path`, loading any previous entries.
    pub fn open(data_dir: &Path, model_path: &Path) -> Self {
        let path = Self::path_for(data_dir, model_path);
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Entries>(&bytes) {
                Ok(entries) => {
                    debug!(path = %path.display(), elements = entries.elements.len(), "loaded geometry cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt geometry cache, starting empty");
                    Entries::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable geometry cache, starting empty");
                Entries::default()
            }
        };
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeometryStore for FileStore {
    fn get(&self, guid: &Guid, fingerprint: &str) -> Option<Vec<ProjectedPath>> {
        self.entries.get(guid, fingerprint)
    }

    fn put(&mut self, guid: Guid, entry: CacheEntry) {
        self.entries.put(guid, entry);
        self.dirty = true;
    }

    fn evict(&mut self, guid: &Guid) -> bool {
        let removed = self.entries.evict(guid);
        self.dirty |= removed;
        removed
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let cache_err = |e: &dyn std::fmt::Display| {
            DrawError::Cache(format!("{}: {e}", self.path.display()))
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| cache_err(&e))?;
        }
        let json = serde_json::to_vec(&self.entries).map_err(|e| cache_err(&e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| cache_err(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| cache_err(&e))?;
        self.dirty = false;
        debug!(path = %self.path.display(), elements = self.entries.elements.len(), "flushed geometry cache");
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.elements.len()
    }
}
