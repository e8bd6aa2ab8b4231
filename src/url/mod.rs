//! URL handling module for SiteLens
//!
//! Host extraction for link classification and validation of submitted
//! target URLs.

mod host;

pub use host::raw_host;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses and validates a URL submitted for crawling
///
/// The URL must be absolute, use the `http` or `https` scheme and carry a host.
///
/// # Examples
///
/// ```
/// use sitelens::url::parse_target_url;
///
/// assert!(parse_target_url("https://example.com/").is_ok());
/// assert!(parse_target_url("ftp://example.com/").is_err());
/// assert!(parse_target_url("/relative").is_err());
/// ```
pub fn parse_target_url(input: &str) -> UrlResult<Url> {
    let url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", input, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
