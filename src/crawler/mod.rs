//! Crawler module for single-page analysis
//!
//! This module contains the core crawling logic, including:
//! - Admission control over concurrently executing jobs
//! - HTTP fetching with a per-request timeout
//! - HTML parsing, link classification and login-form detection
//! - Liveness probing of a bounded sample of links

mod broken_links;
mod coordinator;
mod fetcher;
mod links;
mod login;
mod metadata;
mod parser;
mod registry;

pub use broken_links::{
    check_sample, probe_link, sample_candidates, ProbeOutcome, PLACEHOLDER_LINK_TEXT,
};
pub use coordinator::Orchestrator;
pub use fetcher::{build_http_client, fetch_document};
pub use links::LinkCollector;
pub use login::{is_login_form, is_password_input};
pub use metadata::{BrokenLink, ExtractedMetadata, HeadingCounts};
pub use parser::{analyze_document, parse_document, traverse, PageSignals, DEFAULT_HTML_VERSION};
pub use registry::{ActiveCrawlRegistry, ActiveSlot};
