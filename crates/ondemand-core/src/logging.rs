//! `tracing` setup for the CLI and the callback service.
//!
//! Events go to `$XDG_STATE_HOME/ondemand/ondemand.log`; `init_logging_stderr` covers hosts
//! where that file cannot be opened.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,ondemand=debug";

/// Per-event sink: a clone of the log file handle, or stderr if cloning it fails.
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber, appending plain-text events to `ondemand.log` in the
/// XDG state directory. The filter comes from `RUST_LOG`, else `info,ondemand=debug`.
///
/// Errors when the directory or file cannot be opened, or a subscriber is already set.
pub fn init_logging() -> Result<()> {
    let dirs = xdg::BaseDirectories::with_prefix("ondemand")?;
    let log_dir = dirs.get_state_home();

    fs::create_dir_all(&log_dir)?;
    let log_path: PathBuf = log_dir.join("ondemand.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    struct SharedLogFile(std::fs::File);

    impl<'a> MakeWriter<'a> for SharedLogFile {
        type Writer = FileOrStderr;

        fn make_writer(&'a self) -> Self::Writer {
            self.0
                .try_clone()
                .map(FileOrStderr::File)
                .unwrap_or(FileOrStderr::Stderr)
        }
    }

    let writer: BoxMakeWriter = BoxMakeWriter::new(SharedLogFile(file));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already set: {}", e))?;

    tracing::info!(path = %log_path.display(), "logging started");

    Ok(())
}

/// Installs a stderr-only subscriber with the same filter. A no-op if one is already set.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
