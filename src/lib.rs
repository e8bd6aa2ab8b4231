//! SiteLens: single-page crawl orchestration and HTML metadata extraction
//!
//! This crate admits crawl jobs under a global concurrency cap, fetches each
//! job's page, and extracts structural metadata: title, heading counts, link
//! classification, login-form detection and a broken-link sample.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for SiteLens operations
#[derive(Debug, Error)]
pub enum SiteLensError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Admission error: {0}")]
    Admit(#[from] AdmitError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned synchronously when a job cannot be admitted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmitError {
    #[error("crawl already in progress for ID: {job_id}")]
    AlreadyActive { job_id: String },

    #[error("maximum concurrent crawls reached ({max})")]
    CapacityExceeded { max: usize },

    #[error("crawl job not found: {job_id}")]
    UnknownJob { job_id: String },

    #[error("crawl job {job_id} is {status}, not queued")]
    NotQueued {
        job_id: String,
        status: state::JobStatus,
    },

    #[error("could not read crawl job {job_id}: {message}")]
    Lookup { job_id: String, message: String },
}

/// Errors produced while retrieving a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for SiteLens operations
pub type Result<T> = std::result::Result<T, SiteLensError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlSettings};
pub use crawler::{ExtractedMetadata, Orchestrator};
pub use state::JobStatus;
pub use storage::{CrawlJob, JobStore, SqliteJobStore};
