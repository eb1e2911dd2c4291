//! Lazily loaded, shared index handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::RagResult;
use crate::vector::VectorIndex;

/// Owns the path of an index artifact and loads it at most once.
///
/// Concurrent first callers serialize on the load lock; once loaded, every
/// caller gets the same `Arc` without locking. A failed load is not cached,
/// so a later call retries (for example after `docent ingest` has run).
#[derive(Debug)]
pub struct IndexHandle {
    path: PathBuf,
    probe_clusters: Option<usize>,
    index: OnceLock<Arc<VectorIndex>>,
    load_lock: Mutex<()>,
    loads: AtomicUsize,
}

impl IndexHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            probe_clusters: None,
            index: OnceLock::new(),
            load_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Handle around an index that is already in memory.
    pub fn from_index(path: impl Into<PathBuf>, index: VectorIndex) -> Self {
        let handle = Self::new(path);
        let _ = handle.index.set(Arc::new(index));
        handle
    }

    /// Overrides the number of partitions probed per query.
    #[must_use]
    pub fn with_probe_clusters(mut self, probe: usize) -> Self {
        self.probe_clusters = Some(probe);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    /// Number of times the artifact was read from disk.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Returns the index, reading it from disk on first use.
    pub fn get(&self) -> RagResult<Arc<VectorIndex>> {
        if let Some(index) = self.index.get() {
            return Ok(Arc::clone(index));
        }

        let _guard = self.load_lock.lock();
        if let Some(index) = self.index.get() {
            return Ok(Arc::clone(index));
        }

        tracing::debug!("loading index from {}", self.path.display());
        self.loads.fetch_add(1, Ordering::Relaxed);
        let mut index = VectorIndex::load(&self.path)?;
        if let Some(probe) = self.probe_clusters {
            index = index.with_probe_clusters(probe);
        }

        let index = Arc::new(index);
        let _ = self.index.set(Arc::clone(&index));
        tracing::info!(
            "Loaded index with {} entries from {}",
            index.len(),
            self.path.display()
        );
        Ok(index)
    }
}
