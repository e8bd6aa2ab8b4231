//! Storage module for persisting crawl jobs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Job status transitions
//! - Atomic attachment of extracted metadata
//! - Filtered listing and status counts for reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteJobStore;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::crawler::ExtractedMetadata;
use crate::state::JobStatus;
use chrono::{DateTime, Utc};

/// One request to fetch and analyze a single URL
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    /// Present only once the job is `Completed`
    pub metadata: Option<ExtractedMetadata>,
    pub crawled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing jobs
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Only jobs in this status
    pub status: Option<JobStatus>,
    /// Substring match against url or title
    pub search: Option<String>,
}

impl JobFilter {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            search: None,
        }
    }
}
