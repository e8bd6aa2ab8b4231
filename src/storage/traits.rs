//! Storage traits and error types
//!
//! This module defines the interface the orchestrator uses to persist crawl
//! jobs, plus the read-side queries used by reporting.

use crate::crawler::ExtractedMetadata;
use crate::state::JobStatus;
use crate::storage::{CrawlJob, JobFilter};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid status transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job persistence backends
///
/// The orchestrator is the only writer of status for jobs it executes;
/// submission creates the record and reporting only reads.
pub trait JobStore {
    // ===== Submission =====

    /// Creates a new job in `Queued` status and returns it
    fn create_job(&mut self, url: &str) -> StorageResult<CrawlJob>;

    // ===== Pipeline Writes =====

    /// Moves a job to `Running`
    ///
    /// Fails with `InvalidTransition` unless the job is `Queued`.
    fn mark_running(&mut self, job_id: &str) -> StorageResult<()>;

    /// Moves a job to `Completed` and attaches its metadata atomically
    fn mark_completed(
        &mut self,
        job_id: &str,
        metadata: &ExtractedMetadata,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Moves a job to `Error` and records the message
    fn mark_error(&mut self, job_id: &str, message: &str) -> StorageResult<()>;

    /// Resets a job to `Queued` (explicit stop)
    ///
    /// Unknown ids and jobs already `Completed` or `Error` are left alone.
    fn reset_to_queued(&mut self, job_id: &str) -> StorageResult<()>;

    /// Moves a `Completed` or `Error` job back to `Queued` so it can run again
    ///
    /// Clears the error message, the metadata and the crawl time. Fails with
    /// `InvalidTransition` for a job that has not finished.
    fn requeue(&mut self, job_id: &str) -> StorageResult<()>;

    // ===== Reads =====

    /// Gets a job with its metadata, if any
    fn get_job(&self, job_id: &str) -> StorageResult<CrawlJob>;

    /// Gets only a job's status
    fn job_status(&self, job_id: &str) -> StorageResult<JobStatus> {
        self.get_job(job_id).map(|job| job.status)
    }

    /// Lists jobs matching `filter`, newest first
    fn list_jobs(&self, filter: &JobFilter) -> StorageResult<Vec<CrawlJob>>;

    /// Counts jobs in a status
    fn count_by_status(&self, status: JobStatus) -> StorageResult<u64>;

    /// Counts all jobs
    fn count_total(&self) -> StorageResult<u64>;

    // ===== Housekeeping =====

    /// Deletes a job and its metadata; returns false if it did not exist
    fn delete_job(&mut self, job_id: &str) -> StorageResult<bool>;

    /// Deletes several jobs; returns how many existed
    fn delete_jobs(&mut self, job_ids: &[String]) -> StorageResult<u64> {
        let mut deleted = 0;
        for job_id in job_ids {
            if self.delete_job(job_id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
