//! State module for tracking crawl job progress
//!
//! - `JobStatus`: lifecycle of a single crawl job (queued, running, completed, error)

mod job_state;

pub use job_state::JobStatus;
