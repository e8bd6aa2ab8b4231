//! Link classification relative to the crawled page's host
//!
//! | href | Result |
//! |------|--------|
//! | absolute, same host | internal, original text |
//! | absolute, other host | external, original text |
//! | relative | internal, resolved against the page URL |
//! | unparsable | dropped |

use crate::url::raw_host;
use std::collections::HashMap;
use url::{ParseError, Url};

/// Accumulates classified links in document order
#[derive(Debug, Default)]
pub struct LinkCollector {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    /// Text of the first anchor seen for each stored link
    anchor_text: HashMap<String, String>,
}

impl LinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `href` and appends it to the internal or external list
    ///
    /// `base_host` is compared byte-for-byte with the href's host (see
    /// [`raw_host`]). Relative references are resolved against `base_url`
    /// and always counted as internal.
    pub fn classify(&mut self, href: &str, text: Option<&str>, base_host: &str, base_url: &Url) {
        match Url::parse(href) {
            Ok(_) => {
                if raw_host(href) == base_host {
                    self.push_internal(href.to_string(), text);
                } else {
                    self.push_external(href.to_string(), text);
                }
            }
            Err(ParseError::RelativeUrlWithoutBase) => match base_url.join(href) {
                Ok(resolved) => self.push_internal(resolved.to_string(), text),
                Err(e) => {
                    tracing::trace!("Dropping unresolvable link {:?}: {}", href, e);
                }
            },
            Err(e) => {
                tracing::trace!("Dropping unparsable link {:?}: {}", href, e);
            }
        }
    }

    /// Returns the recorded anchor text for a stored link
    pub fn text_for(&self, link: &str) -> Option<&str> {
        self.anchor_text.get(link).map(String::as_str)
    }

    /// Consumes the collector, yielding (internal, external, anchor texts)
    pub fn into_parts(self) -> (Vec<String>, Vec<String>, HashMap<String, String>) {
        (self.internal, self.external, self.anchor_text)
    }

    fn push_internal(&mut self, link: String, text: Option<&str>) {
        self.remember_text(&link, text);
        self.internal.push(link);
    }

    fn push_external(&mut self, link: String, text: Option<&str>) {
        self.remember_text(&link, text);
        self.external.push(link);
    }

    fn remember_text(&mut self, link: &str, text: Option<&str>) {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            self.anchor_text
                .entry(link.to_string())
                .or_insert_with(|| text.to_string());
        }
    }
}
