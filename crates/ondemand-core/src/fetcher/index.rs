//! Per-directory sidecar mapping source URLs to the filenames they produced.
//!
//! Lets a repeat fetch find its artifact without asking the server for the
//! filename again. Losing or corrupting the file only costs one extra request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const INDEX_FILE_NAME: &str = ".ondemand-index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct CacheIndex {
    path: PathBuf,
    file: IndexFile,
}

impl CacheIndex {
    /// Loads the index in `dir`. Missing or unreadable indexes start empty.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(INDEX_FILE_NAME);
        let file = read_index(&path);
        Self { path, file }
    }

    pub fn lookup(&self, source_url: &str) -> Option<&str> {
        self.file.entries.get(source_url).map(String::as_str)
    }

    /// Records `source_url -> filename` and rewrites the sidecar atomically.
    ///
    /// Entries written by other writers since `open` are merged in first. Callers sharing a
    /// directory must hold its index lock (`PathLocks::dir_handle`) across this call.
    pub fn record(&mut self, source_url: &str, filename: &str) -> io::Result<()> {
        self.file = read_index(&self.path);
        if self.lookup(source_url) == Some(filename) {
            return Ok(());
        }
        self.file
            .entries
            .insert(source_url.to_string(), filename.to_string());
        self.save()
    }

    /// Drops an entry whose file is gone or rejected.
    pub fn forget(&mut self, source_url: &str) -> io::Result<()> {
        self.file = read_index(&self.path);
        if self.file.entries.remove(source_url).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> io::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let json = serde_json::to_vec_pretty(&self.file).map_err(io::Error::other)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn read_index(path: &Path) -> IndexFile {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring malformed cache index: {}", e);
            IndexFile::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => IndexFile::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot read cache index: {}", e);
            IndexFile::default()
        }
    }
}
