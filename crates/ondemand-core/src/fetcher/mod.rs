//! Idempotent download of one artifact into a destination directory.
//!
//! A fetch resolves the final filename from the response, returns the file
//! already on disk when there is one, and otherwise streams the body through
//! a staging file that is renamed into place once complete.

mod error;
mod index;
mod progress;
mod transfer;

pub use error::FetchError;
pub use index::{CacheIndex, INDEX_FILE_NAME};
pub use progress::{LogProgress, NoProgress, ProgressSink};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checksum::{digest_matches, sha256_path};
use crate::storage::{PathLocks, Persisted};
use transfer::Transfer;

/// libcurl receive buffer size, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u32);

impl ChunkSize {
    pub const MIN_KIB: u32 = 1;
    pub const MAX_KIB: u32 = 12;
    pub const DEFAULT_KIB: u32 = 4;

    pub fn new(kib: u32) -> Result<Self, FetchError> {
        if (Self::MIN_KIB..=Self::MAX_KIB).contains(&kib) {
            Ok(Self(kib))
        } else {
            Err(FetchError::InvalidChunkSize(kib))
        }
    }

    pub fn kib(self) -> u32 {
        self.0
    }

    pub fn bytes(self) -> usize {
        self.0 as usize * 1024
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT_KIB)
    }
}

impl TryFrom<u32> for ChunkSize {
    type Error = FetchError;

    fn try_from(kib: u32) -> Result<Self, Self::Error> {
        Self::new(kib)
    }
}

/// How much a same-named file on disk is trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Any existing file with the derived name is the artifact.
    #[default]
    TrustExisting,
    /// Existing and fresh files are checked against the request's SHA-256, when it has one.
    VerifySha256,
}

/// Network knobs shared by artifact and catalog requests.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Whole-transfer limit; `None` lets large artifacts take as long as they need.
    pub transfer_timeout: Option<Duration>,
    pub max_redirections: u32,
    pub cache_policy: CachePolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            transfer_timeout: None,
            max_redirections: 10,
            cache_policy: CachePolicy::TrustExisting,
        }
    }
}

/// One artifact to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub destination_dir: PathBuf,
    /// Catalog name, used for logs and progress only.
    pub display_name: String,
    /// Bearer token; `None` or empty sends no Authorization header.
    pub credential: Option<String>,
    pub chunk_size: ChunkSize,
    pub expected_sha256: Option<String>,
}

impl DownloadRequest {
    pub fn new(
        source_url: impl Into<String>,
        destination_dir: impl Into<PathBuf>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            destination_dir: destination_dir.into(),
            display_name: display_name.into(),
            credential: None,
            chunk_size: ChunkSize::default(),
            expected_sha256: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_expected_sha256(mut self, sha256: Option<String>) -> Self {
        self.expected_sha256 = sha256;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The artifact was already on disk; nothing was stored.
    Cached(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::Cached(p) => p,
            FetchOutcome::Downloaded { path, .. } => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            FetchOutcome::Cached(p) => p,
            FetchOutcome::Downloaded { path, .. } => path,
        }
    }

    /// Final filename, as handed to loaders.
    pub fn file_name(&self) -> Option<String> {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, FetchOutcome::Cached(_))
    }
}

/// Downloads artifacts, serializing writers that target the same destination.
#[derive(Default)]
pub struct Fetcher {
    settings: FetchSettings,
    locks: PathLocks,
}

impl Fetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            locks: PathLocks::new(),
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Ensures the artifact exists in `req.destination_dir` and returns its path.
    ///
    /// Safe to call repeatedly and concurrently: a second call for the same
    /// URL and directory returns `Cached` without touching the network.
    pub fn fetch(
        &self,
        req: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, FetchError> {
        let result = self.fetch_locked(req, progress);
        match &result {
            Ok(FetchOutcome::Cached(path)) => tracing::info!(
                name = %req.display_name,
                path = %path.display(),
                "artifact already present, skipping download"
            ),
            Ok(FetchOutcome::Downloaded { path, bytes }) => tracing::info!(
                name = %req.display_name,
                path = %path.display(),
                bytes,
                "artifact downloaded"
            ),
            Err(e) => tracing::error!(
                name = %req.display_name,
                url = %req.source_url,
                dir = %req.destination_dir.display(),
                "fetch failed: {}",
                e
            ),
        }
        result
    }

    fn fetch_locked(
        &self,
        req: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, FetchError> {
        let dir = &req.destination_dir;
        fs::create_dir_all(dir)?;

        let handle = self.locks.handle(dir, &req.source_url);
        let _guard = handle.lock();

        let expected = match self.settings.cache_policy {
            CachePolicy::VerifySha256 => req.expected_sha256.as_deref(),
            CachePolicy::TrustExisting => None,
        };
        let accept_existing = |path: &Path| match expected {
            None => true,
            Some(want) => verify_existing(path, want),
        };

        let mut index = CacheIndex::open(dir);
        if let Some(name) = index.lookup(&req.source_url) {
            let path = dir.join(name);
            if path.is_file() && accept_existing(&path) {
                tracing::debug!(url = %req.source_url, "cache index hit");
                return Ok(FetchOutcome::Cached(path));
            }
            let dir_lock = self.locks.dir_handle(dir);
            let _index_guard = dir_lock.lock();
            if let Err(e) = index.forget(&req.source_url) {
                tracing::warn!(dir = %dir.display(), "cannot update cache index: {}", e);
            }
        }

        tracing::debug!(name = %req.display_name, url = %req.source_url, "requesting");
        let outcome = match transfer::run(req, &self.settings, &accept_existing, progress)? {
            Transfer::Existing { path, filename } => {
                self.remember(dir, &mut index, &req.source_url, &filename);
                FetchOutcome::Cached(path)
            }
            Transfer::Staged {
                mut staging,
                filename,
            } => {
                staging.sync()?;
                if let Some(want) = expected {
                    let actual = sha256_path(staging.path())?;
                    if !digest_matches(&actual, want) {
                        return Err(FetchError::ChecksumMismatch {
                            expected: want.to_string(),
                            actual,
                        });
                    }
                }
                let bytes = staging.written();
                let final_path = dir.join(&filename);
                let outcome = if expected.is_some() && final_path.exists() {
                    // Only reached when the existing file failed verification.
                    let path = staging.persist_replace(&final_path)?;
                    FetchOutcome::Downloaded { path, bytes }
                } else {
                    match staging.persist_noclobber(&final_path)? {
                        Persisted::Renamed(path) => FetchOutcome::Downloaded { path, bytes },
                        Persisted::AlreadyPresent(path) => FetchOutcome::Cached(path),
                    }
                };
                self.remember(dir, &mut index, &req.source_url, &filename);
                outcome
            }
        };
        Ok(outcome)
    }

    fn remember(&self, dir: &Path, index: &mut CacheIndex, source_url: &str, filename: &str) {
        let dir_lock = self.locks.dir_handle(dir);
        let _guard = dir_lock.lock();
        if let Err(e) = index.record(source_url, filename) {
            tracing::warn!(url = source_url, "cannot update cache index: {}", e);
        }
    }
}

fn verify_existing(path: &Path, expected: &str) -> bool {
    match sha256_path(path) {
        Ok(actual) if digest_matches(&actual, expected) => true,
        Ok(actual) => {
            tracing::warn!(
                path = %path.display(),
                expected,
                actual = %actual,
                "cached artifact failed verification, downloading again"
            );
            false
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "cannot hash cached artifact: {}", e);
            false
        }
    }
}
