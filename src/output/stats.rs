//! Job statistics from the job store
//!
//! This module provides functionality for extracting and displaying
//! per-status job counts.

use crate::state::JobStatus;
use crate::storage::{JobStore, StorageResult};
use std::collections::HashMap;

/// Job counts summary
#[derive(Debug, Clone, Default)]
pub struct JobStatistics {
    /// Total number of jobs
    pub total: u64,

    /// Count of jobs by status; statuses with no jobs are absent
    pub by_status: HashMap<JobStatus, u64>,
}

impl JobStatistics {
    pub fn count(&self, status: JobStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(JobStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the store
pub fn load_statistics(store: &dyn JobStore) -> StorageResult<JobStatistics> {
    let total = store.count_total()?;

    let mut by_status = HashMap::new();
    for status in JobStatus::all() {
        let count = store.count_by_status(status)?;
        if count > 0 {
            by_status.insert(status, count);
        }
    }

    Ok(JobStatistics { total, by_status })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &JobStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Total jobs: {}", stats.total);
    println!();

    println!("Jobs by Status:");
    for status in JobStatus::all() {
        let count = stats.count(status);
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
}
