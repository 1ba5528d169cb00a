//! Image compression cache.
//!
//! A JSON manifest maps each source (project-relative, forward slashes) to
//! the hash of its content and of the compression options it was last
//! processed with. A source is skipped only when both match and its output
//! still exists.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::debug;
use crate::freshness::ContentHash;
use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source: ContentHash,
    pub options: ContentHash,
}

pub struct ImageCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    dirty: AtomicBool,
}

impl ImageCache {
    /// Load the manifest. A missing or unreadable manifest starts empty.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                debug!("images"; "ignoring corrupt cache {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn is_fresh(&self, key: &str, entry: &CacheEntry) -> bool {
        self.entries.lock().get(key) == Some(entry)
    }

    pub fn record(&self, key: String, entry: CacheEntry) {
        self.entries.lock().insert(key, entry);
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Drop entries whose key fails `keep`, e.g. sources deleted since.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| keep(key));
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("images"; "pruned {} stale cache entries", pruned);
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Write the manifest back if anything was recorded.
    pub fn save(&self) -> Result<(), PipelineError> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(&*self.entries.lock())
            .map_err(|e| PipelineError::compile(&self.path, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::Io(parent.to_path_buf(), e))?;
        }
        // write-then-rename so an interrupted run never leaves half a manifest
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| PipelineError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| PipelineError::Io(self.path.clone(), e))
    }
}
