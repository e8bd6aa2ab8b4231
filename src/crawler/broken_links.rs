//! Broken-link sampling
//!
//! Probes the first few discovered links (internal first, then external) with
//! a HEAD request. A link is broken when the probe fails outright or answers
//! with a status of 400 or above.

use crate::crawler::metadata::BrokenLink;
use reqwest::Client;
use std::collections::HashMap;

/// Reported as the link text when no anchor text was captured
pub const PLACEHOLDER_LINK_TEXT: &str = "Link text";

/// Result of probing one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this status
    Status(u16),
    /// No response: DNS, connect, TLS or timeout failure
    Unreachable,
}

impl ProbeOutcome {
    pub fn is_broken(&self) -> bool {
        match self {
            Self::Status(code) => *code >= 400,
            Self::Unreachable => true,
        }
    }

    /// Status code to report: the real code, or 0 when nothing answered
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Status(code) => *code,
            Self::Unreachable => 0,
        }
    }
}

/// Selects the links to probe: internal then external, first `max_sample`
///
/// No deduplication or shuffling is applied.
pub fn sample_candidates<'a>(
    internal: &'a [String],
    external: &'a [String],
    max_sample: usize,
) -> Vec<&'a str> {
    internal
        .iter()
        .chain(external.iter())
        .take(max_sample)
        .map(String::as_str)
        .collect()
}

/// Sends one HEAD request to `url`
pub async fn probe_link(client: &Client, url: &str) -> ProbeOutcome {
    match client.head(url).send().await {
        Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
        Err(e) => {
            tracing::debug!("Probe failed for {}: {}", url, e);
            ProbeOutcome::Unreachable
        }
    }
}

/// Probes a bounded sample of links and returns those that are broken
///
/// Probes run one after another in candidate order, so the result keeps
/// that order. `anchor_text` supplies the text reported for each link.
pub async fn check_sample(
    client: &Client,
    internal: &[String],
    external: &[String],
    anchor_text: &HashMap<String, String>,
    max_sample: usize,
) -> Vec<BrokenLink> {
    let candidates = sample_candidates(internal, external, max_sample);
    tracing::debug!("Checking {} sampled links", candidates.len());

    let mut broken = Vec::new();
    for url in candidates {
        let outcome = probe_link(client, url).await;
        if outcome.is_broken() {
            broken.push(BrokenLink {
                url: url.to_string(),
                status_code: outcome.status_code(),
                text: anchor_text
                    .get(url)
                    .cloned()
                    .unwrap_or_else(|| PLACEHOLDER_LINK_TEXT.to_string()),
            });
        }
    }

    broken
}
