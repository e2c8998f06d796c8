//! Hidden staging file that becomes the final artifact only on success.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use super::TEMP_SUFFIX;

/// Longest filename accepted by common filesystems (bytes).
const NAME_MAX: usize = 255;
/// Random characters `tempfile` puts between prefix and suffix.
const RANDOM_LEN: usize = 6;

/// `.<name>.` with `name` cut on a char boundary so the whole staging name fits in `NAME_MAX`.
fn staging_prefix(final_name: &str) -> String {
    let budget = NAME_MAX - RANDOM_LEN - TEMP_SUFFIX.len() - 2;
    let mut take = final_name.len().min(budget);
    while !final_name.is_char_boundary(take) {
        take -= 1;
    }
    format!(".{}.", &final_name[..take])
}

/// How a staging file ended up at its final path.
#[derive(Debug)]
pub enum Persisted {
    /// The staging file was renamed into place.
    Renamed(PathBuf),
    /// Another writer produced the final file first; the staged bytes were discarded.
    AlreadyPresent(PathBuf),
}

/// Sequential writer for a download in progress.
///
/// Lives next to the final path as `.<name>.<random>.part`, so an interrupted
/// transfer never looks like a cached artifact. Dropping it deletes the file.
pub struct StagingFile {
    inner: tempfile::NamedTempFile,
    written: u64,
}

impl StagingFile {
    /// Creates a staging file in `dir` for an artifact that will be called `final_name`.
    pub fn create(dir: &Path, final_name: &str) -> io::Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(&staging_prefix(final_name))
            .rand_bytes(RANDOM_LEN)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        Ok(Self { inner, written: 0 })
    }

    /// Reserve `size` bytes up front. On Unix tries `posix_fallocate`; failures are not fatal.
    pub fn preallocate(&mut self, size: u64) {
        #[cfg(unix)]
        {
            let fd = self.inner.as_file().as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r != 0 {
                tracing::debug!(
                    errno = r,
                    "posix_fallocate failed, continuing without preallocation"
                );
            }
        }
        #[cfg(not(unix))]
        {
            let _ = size;
        }
    }

    /// Append `data`; returns the cumulative byte count.
    pub fn append(&mut self, data: &[u8]) -> io::Result<u64> {
        self.inner.as_file_mut().write_all(data)?;
        self.written += data.len() as u64;
        Ok(self.written)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Drops any preallocated tail and flushes data to disk.
    pub fn sync(&mut self) -> io::Result<()> {
        let file: &File = self.inner.as_file();
        file.set_len(self.written)?;
        file.sync_all()
    }

    /// Renames into `final_path` unless something is already there.
    pub fn persist_noclobber(self, final_path: &Path) -> io::Result<Persisted> {
        match self.inner.persist_noclobber(final_path) {
            Ok(_) => Ok(Persisted::Renamed(final_path.to_path_buf())),
            Err(e) if final_path.exists() => {
                tracing::debug!(
                    path = %final_path.display(),
                    "final file appeared during transfer: {}",
                    e.error
                );
                Ok(Persisted::AlreadyPresent(final_path.to_path_buf()))
            }
            Err(e) => Err(e.error),
        }
    }

    /// Renames into `final_path`, replacing whatever is there.
    pub fn persist_replace(self, final_path: &Path) -> io::Result<PathBuf> {
        self.inner.persist(final_path).map_err(|e| e.error)?;
        Ok(final_path.to_path_buf())
    }
}
