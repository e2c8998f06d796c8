//! Filename hint from a URL path.

/// Last non-empty path segment of `url`, ignoring query and fragment.
///
/// `None` if the URL does not parse or has no usable segment.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;
    match segment {
        "." | ".." => None,
        s => Some(s.to_string()),
    }
}
