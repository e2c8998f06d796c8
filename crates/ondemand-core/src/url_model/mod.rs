//! Local filename derivation for downloaded artifacts.
//!
//! The server's `Content-Disposition` hint wins; otherwise the last path
//! segment of the source URL is used. Either way the result is sanitized.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;

/// Used when neither the header nor the URL yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Filename to store the artifact from `url` under.
///
/// # Examples
///
/// - `derive_filename("https://host/path/to/artifact.bin?token=abc", None)` → `"artifact.bin"`
/// - `derive_filename("https://host/x", Some("attachment; filename=\"model_v2.safetensors\""))`
///   gives `"model_v2.safetensors"`
pub fn derive_filename(url: &str, content_disposition: Option<&str>) -> String {
    let from_header = content_disposition
        .and_then(parse_content_disposition_filename)
        .map(|s| sanitize_filename(&s))
        .filter(|s| !s.is_empty());

    from_header
        .or_else(|| {
            filename_from_url_path(url)
                .map(|s| sanitize_filename(&s))
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
