//! Report data gathered from the job store

use crate::output::stats::JobStatistics;
use crate::state::JobStatus;
use crate::storage::{CrawlJob, StorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything a report renders
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub config_fingerprint: String,
    pub statistics: JobStatistics,
    /// Completed jobs, newest first
    pub completed: Vec<CrawlJob>,
    /// Failed jobs, newest first
    pub failed: Vec<CrawlJob>,
}

impl ReportSummary {
    /// Percentage of finished jobs that completed
    pub fn success_rate(&self) -> f64 {
        let completed = self.statistics.count(JobStatus::Completed);
        let finished = completed + self.statistics.count(JobStatus::Error);
        if finished == 0 {
            0.0
        } else {
            completed as f64 / finished as f64 * 100.0
        }
    }

    /// Total broken links across completed jobs
    pub fn broken_link_total(&self) -> usize {
        self.completed
            .iter()
            .filter_map(|job| job.metadata.as_ref())
            .map(|metadata| metadata.broken_links.len())
            .sum()
    }
}
