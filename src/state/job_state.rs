/// Job status definitions for tracking crawl progress
///
/// A job moves `Queued -> Running -> {Completed, Error}`. An explicit stop
/// moves a running job back to `Queued`, and a finished job is re-queued to
/// run again.
use std::fmt;

/// Represents the current status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job has been submitted and is waiting to be admitted
    Queued,

    /// Job is currently executing its pipeline
    Running,

    /// Job finished and its metadata is attached
    Completed,

    /// Job failed; the error message is recorded on the job
    Error,
}

impl JobStatus {
    /// Returns true if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if the job may move from `self` to `next`
    ///
    /// Besides the forward path this allows:
    /// - `Running -> Queued`: explicit stop
    /// - `Queued -> {Completed, Error}`: a stopped task still finishing
    /// - `{Completed, Error} -> Queued`: re-queue for another run
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Error)
                | (Self::Running, Self::Queued)
                | (Self::Queued, Self::Completed)
                | (Self::Queued, Self::Error)
                | (Self::Completed, Self::Queued)
                | (Self::Error, Self::Queued)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 4] {
        [Self::Queued, Self::Running, Self::Completed, Self::Error]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
