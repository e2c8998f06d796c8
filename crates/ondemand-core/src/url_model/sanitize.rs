//! Filesystem-safe artifact filenames.

/// Longest filename accepted by common filesystems (bytes).
const NAME_MAX: usize = 255;

/// Makes a server- or URL-provided name safe to join onto a destination directory.
///
/// Path separators, NUL, control characters and characters reserved on
/// Windows become `_`. Leading dots and surrounding whitespace are stripped so
/// the result can neither escape the directory nor collide with hidden
/// staging files. Truncated to `NAME_MAX` bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced
        .trim()
        .trim_start_matches('.')
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
