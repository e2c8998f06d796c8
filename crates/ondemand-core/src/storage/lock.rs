//! In-process serialization of writers targeting the same artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of one mutex per `(destination dir, source URL)`, plus one per directory
/// guarding that directory's cache index.
///
/// Entries are never removed; the key space is bounded by the catalog.
#[derive(Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<(PathBuf, String), Arc<Mutex<()>>>>,
    dirs: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one artifact destination. Call `lock()` on it and hold the guard
    /// across the check-then-download sequence.
    pub fn handle(&self, dir: &Path, source_url: &str) -> ArtifactLock {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map
            .entry((dir.to_path_buf(), source_url.to_string()))
            .or_default();
        ArtifactLock(Arc::clone(entry))
    }

    /// Lock handle for the read-modify-write of a directory's cache index.
    pub fn dir_handle(&self, dir: &Path) -> ArtifactLock {
        let mut map = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map.entry(dir.to_path_buf()).or_default();
        ArtifactLock(Arc::clone(entry))
    }
}

pub struct ArtifactLock(Arc<Mutex<()>>);

impl ArtifactLock {
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
