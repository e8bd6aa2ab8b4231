//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Per-status job statistics
//! - Markdown reports of completed and failed jobs

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, JobStatistics};
pub use summary::{OutputError, OutputResult, ReportSummary};

use crate::state::JobStatus;
use crate::storage::{JobFilter, JobStore};
use chrono::Utc;

/// Gathers report data from the store
///
/// # Arguments
///
/// * `store` - The store containing job records
/// * `config_fingerprint` - Fingerprint of the settings the jobs ran under
///
/// # Returns
///
/// * `Ok(ReportSummary)` - Successfully gathered report data
/// * `Err(OutputError)` - Failed to query the store
pub fn generate_summary(store: &dyn JobStore, config_fingerprint: &str) -> OutputResult<ReportSummary> {
    let statistics = load_statistics(store)?;
    let completed = store.list_jobs(&JobFilter::with_status(JobStatus::Completed))?;
    let failed = store.list_jobs(&JobFilter::with_status(JobStatus::Error))?;

    Ok(ReportSummary {
        generated_at: Utc::now(),
        config_fingerprint: config_fingerprint.to_string(),
        statistics,
        completed,
        failed,
    })
}
