//! HTTP fetcher implementation
//!
//! Builds the shared HTTP client and retrieves a page's bytes. Every request
//! made with the client is bounded by the configured fetch timeout, which
//! covers connecting, sending and reading the body.
//!
//! No retries are performed.

use crate::FetchError;
use reqwest::Client;
use std::time::Duration;

/// Upper bound on the connect phase when the fetch timeout is longer
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value sent in the `User-Agent` header
/// * `timeout` - Wall-clock budget for each request
///
/// # Example
///
/// ```no_run
/// use sitelens::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("SiteLens/0.1", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the raw bytes of a page
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Non-2xx status | `FetchError::Status` |
/// | Timeout expiry | `FetchError::Timeout` |
/// | DNS, connect, TLS or body failure | `FetchError::Network` |
pub async fn fetch_document(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_error(url, e))?;

    tracing::debug!("Fetched {} ({} bytes)", url, body.len());
    Ok(body.to_vec())
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("connection failed: {}", error),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
