//! Disk side of a fetch: staging files, atomic finalize, per-artifact locking.
//!
//! Bytes go to a hidden `.part` file in the destination directory and are
//! renamed to the final name only once the transfer completed, so the cache
//! check never sees a truncated artifact.

mod lock;
mod writer;

pub use lock::{ArtifactLock, PathLocks};
pub use writer::{Persisted, StagingFile};

use std::fs;
use std::io;
use std::path::Path;

/// Suffix of staging files.
pub const TEMP_SUFFIX: &str = ".part";

/// True for names produced by `StagingFile::create`.
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Deletes staging files left behind by interrupted processes. Returns how many were removed.
pub fn remove_stale_parts(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_staging_name(name) && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            tracing::info!(path = %entry.path().display(), "removed stale staging file");
            removed += 1;
        }
    }
    Ok(removed)
}
