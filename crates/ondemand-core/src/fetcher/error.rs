//! Fetch failure taxonomy.

use super::ChunkSize;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(
        "chunk size {0} KiB out of range ({min}..={max})",
        min = ChunkSize::MIN_KIB,
        max = ChunkSize::MAX_KIB
    )]
    InvalidChunkSize(u32),
    #[error("malformed URL '{0}'")]
    InvalidUrl(String),
    /// libcurl failure: DNS, connect, TLS, timeout, truncated body.
    #[error("request failed: {0}")]
    Network(#[from] curl::Error),
    /// Final response in the redirect chain was not 2xx.
    #[error("HTTP {0}")]
    Http(u32),
    /// Destination directory or staging file could not be written.
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl FetchError {
    /// True when the request never produced a usable response (as opposed to a local failure).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidUrl(_)
                | FetchError::Network(_)
                | FetchError::Http(_)
                | FetchError::PartialTransfer { .. }
        )
    }
}
