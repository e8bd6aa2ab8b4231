//! HTML analyzer for extracting page metadata
//!
//! Parsing is permissive (html5ever recovers from malformed markup). A single
//! depth-first pre-order walk over the element tree collects:
//! - the html version (from a `version` attribute on `<html>`)
//! - the title (first `<title>` element)
//! - heading counts for h1..h6
//! - classified links from `<a href>`
//! - whether any form looks like a login form

use crate::crawler::links::LinkCollector;
use crate::crawler::login::{is_login_form, is_password_input};
use crate::crawler::metadata::HeadingCounts;
use crate::url::raw_host;
use crate::{SiteLensError, UrlError};
use scraper::{ElementRef, Html};
use url::Url;

/// Reported when the root element carries no `version` attribute
pub const DEFAULT_HTML_VERSION: &str = "HTML5";

/// How many leading bytes are inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 1024;

/// Signals gathered from one traversal of a document
#[derive(Debug, Default)]
pub struct PageSignals {
    pub title: String,
    pub html_version: String,
    pub heading_counts: HeadingCounts,
    pub links: LinkCollector,
    pub has_login_form: bool,
}

/// Parses raw document bytes into an HTML tree
///
/// Only input that is not text at all is rejected: a NUL byte within the
/// first kilobyte marks the body as binary. Invalid UTF-8 sequences are
/// replaced and everything else is left to the parser's error recovery.
///
/// # Example
///
/// ```
/// use sitelens::crawler::parse_document;
///
/// let doc = parse_document(b"<title>Hi</title><h1>x", "https://example.com/").unwrap();
/// assert!(parse_document(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", "https://example.com/").is_err());
/// # let _ = doc;
/// ```
pub fn parse_document(bytes: &[u8], url: &str) -> Result<Html, SiteLensError> {
    let head = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if head.contains(&0) {
        return Err(SiteLensError::HtmlParse {
            url: url.to_string(),
            message: "document is binary, not HTML".to_string(),
        });
    }

    let text = String::from_utf8_lossy(bytes);
    Ok(Html::parse_document(&text))
}

/// Parses a fetched page and traverses it against its own URL
///
/// The parsed tree is dropped before returning; only owned signals escape.
pub fn analyze_document(bytes: &[u8], url: &str) -> Result<PageSignals, SiteLensError> {
    let base_url = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    let document = parse_document(bytes, url)?;
    Ok(traverse(&document, raw_host(url), &base_url))
}

/// Walks the document once and collects page signals
///
/// Links are classified against `base_host` (the page's host as written) and
/// relative links are resolved against `base_url`.
pub fn traverse(document: &Html, base_host: &str, base_url: &Url) -> PageSignals {
    let root = document.root_element();
    let mut signals = PageSignals {
        html_version: html_version(root),
        ..PageSignals::default()
    };
    let mut title_seen = false;

    for node in root.descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        match element.value().name() {
            "title" if !title_seen => {
                title_seen = true;
                signals.title = first_text(element);
            }
            "h1" => signals.heading_counts.increment(1),
            "h2" => signals.heading_counts.increment(2),
            "h3" => signals.heading_counts.increment(3),
            "h4" => signals.heading_counts.increment(4),
            "h5" => signals.heading_counts.increment(5),
            "h6" => signals.heading_counts.increment(6),
            "a" => {
                let href = element.value().attr("href").map(str::trim);
                if let Some(href) = href.filter(|h| !h.is_empty()) {
                    let text = element.text().collect::<String>();
                    signals
                        .links
                        .classify(href, Some(&text), base_host, base_url);
                }
            }
            "form" => {
                if is_login_form(element) {
                    signals.has_login_form = true;
                }
            }
            "input" => {
                if is_password_input(element) {
                    signals.has_login_form = true;
                }
            }
            _ => {}
        }
    }

    signals
}

/// Reads the html version from the root element
fn html_version(root: ElementRef<'_>) -> String {
    match root.value().attr("version") {
        Some(version) => format!("HTML {}", version),
        None => DEFAULT_HTML_VERSION.to_string(),
    }
}

/// First non-empty text node under `element`, trimmed
fn first_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}
