//! Blocking HTTP plumbing on libcurl shared by the fetcher and the catalog client.

mod head;

pub use head::ResponseHead;

use curl::easy::{Easy, List};
use std::str;

use crate::credentials::bearer_header;
use crate::fetcher::{FetchError, FetchSettings};

/// Rejects anything that is not an absolute http(s) URL before touching the network.
pub fn validate_url(url: &str) -> Result<(), FetchError> {
    match url::Url::parse(url) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        _ => Err(FetchError::InvalidUrl(url.to_string())),
    }
}

/// GET handle with redirects, timeouts and an optional bearer token applied.
pub(crate) fn easy_get(
    url: &str,
    token: Option<&str>,
    settings: &FetchSettings,
) -> Result<Easy, FetchError> {
    validate_url(url)?;
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(settings.max_redirections)?;
    easy.connect_timeout(settings.connect_timeout)?;
    if let Some(t) = settings.transfer_timeout {
        easy.timeout(t)?;
    }
    if let Some(auth) = bearer_header(token) {
        let mut list = List::new();
        list.append(&auth)?;
        easy.http_headers(list)?;
    }
    Ok(easy)
}

/// Fetches a small document (e.g. a catalog page) into memory.
pub fn get_bytes(
    url: &str,
    token: Option<&str>,
    settings: &FetchSettings,
) -> Result<Vec<u8>, FetchError> {
    let mut easy = easy_get(url, token, settings)?;
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(body)
}

/// Header callback payloads are raw bytes; non-UTF-8 lines are ignored.
pub(crate) fn header_line(data: &[u8]) -> Option<&str> {
    str::from_utf8(data).ok()
}
