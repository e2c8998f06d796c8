//! Incremental parsing of response header lines delivered by libcurl.

/// Metadata of the final response in a redirect chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
}

impl ResponseHead {
    /// Feed one raw header line. A status line starts a new response (redirect hop).
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            *self = ResponseHead {
                status: line.split_whitespace().nth(1).and_then(|s| s.parse().ok()),
                ..ResponseHead::default()
            };
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse().ok();
            } else if name.eq_ignore_ascii_case("content-disposition") {
                self.content_disposition = Some(value.to_string());
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }
}
