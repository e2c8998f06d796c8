//! One streaming GET into a staging file.
//!
//! The final filename is only known once the response headers arrive, so the
//! staging file is opened on the first body chunk. If a file with that name is
//! already acceptable, the transfer is aborted before any body bytes are kept.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use super::{DownloadRequest, FetchError, FetchSettings, ProgressSink};
use crate::http::{self, ResponseHead};
use crate::storage::StagingFile;
use crate::url_model::derive_filename;

/// Result of a transfer that did not fail.
pub(crate) enum Transfer {
    /// The named file already existed and was accepted; no body was stored.
    Existing { path: PathBuf, filename: String },
    /// The full body is in `staging`, waiting to be finalized as `filename`.
    Staged { staging: StagingFile, filename: String },
}

enum State {
    Pending,
    Existing { path: PathBuf, filename: String },
    Writing { staging: StagingFile, filename: String },
    Failed(FetchError),
}

/// Decides, once headers are in, whether to keep an existing file or start writing.
fn begin(
    head: &ResponseHead,
    req: &DownloadRequest,
    accept_existing: &dyn Fn(&Path) -> bool,
    progress: &dyn ProgressSink,
) -> State {
    if !head.is_success() {
        return State::Failed(FetchError::Http(head.status.unwrap_or(0)));
    }
    let filename = derive_filename(&req.source_url, head.content_disposition.as_deref());
    let path = req.destination_dir.join(&filename);
    if path.is_file() && accept_existing(&path) {
        return State::Existing { path, filename };
    }
    match StagingFile::create(&req.destination_dir, &filename) {
        Ok(mut staging) => {
            if let Some(len) = head.content_length {
                staging.preallocate(len);
            }
            progress.on_start(&req.display_name, head.content_length);
            State::Writing { staging, filename }
        }
        Err(e) => State::Failed(FetchError::Io(e)),
    }
}

pub(crate) fn run(
    req: &DownloadRequest,
    settings: &FetchSettings,
    accept_existing: &dyn Fn(&Path) -> bool,
    progress: &dyn ProgressSink,
) -> Result<Transfer, FetchError> {
    let mut easy = http::easy_get(&req.source_url, req.credential.as_deref(), settings)?;
    easy.buffer_size(req.chunk_size.bytes())?;

    let head = RefCell::new(ResponseHead::default());
    let state = RefCell::new(State::Pending);

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Some(line) = http::header_line(data) {
                head.borrow_mut().feed_line(line);
            }
            true
        })?;
        transfer.write_function(|data| {
            let mut st = state.borrow_mut();
            if matches!(*st, State::Pending) {
                *st = begin(&head.borrow(), req, accept_existing, progress);
            }
            let appended = match &mut *st {
                State::Writing { staging, .. } => staging.append(data),
                // Returning less than `data.len()` makes libcurl abort the transfer.
                _ => return Ok(0),
            };
            match appended {
                Ok(total) => {
                    progress.on_progress(total, head.borrow().content_length);
                    Ok(data.len())
                }
                Err(e) => {
                    *st = State::Failed(FetchError::Io(e));
                    Ok(0)
                }
            }
        })?;
        transfer.perform()
    };

    let head = head.into_inner();
    let state = match (state.into_inner(), performed) {
        (State::Existing { path, filename }, _) => {
            return Ok(Transfer::Existing { path, filename })
        }
        (State::Failed(e), _) => return Err(e),
        (_, Err(e)) => return Err(FetchError::Network(e)),
        // Empty body: the write callback never ran.
        (State::Pending, Ok(())) => begin(&head, req, accept_existing, progress),
        (writing, Ok(())) => writing,
    };

    match state {
        State::Existing { path, filename } => Ok(Transfer::Existing { path, filename }),
        State::Failed(e) => Err(e),
        State::Pending => Err(FetchError::Http(easy.response_code()?)),
        State::Writing { staging, filename } => {
            let code = easy.response_code()?;
            if !(200..300).contains(&code) {
                return Err(FetchError::Http(code));
            }
            let received = staging.written();
            if let Some(expected) = head.content_length {
                if received != expected {
                    return Err(FetchError::PartialTransfer { expected, received });
                }
            }
            progress.on_finish(received);
            Ok(Transfer::Staged { staging, filename })
        }
    }
}
