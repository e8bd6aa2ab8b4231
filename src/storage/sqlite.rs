//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::crawler::{BrokenLink, ExtractedMetadata, HeadingCounts};
use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{CrawlJob, JobFilter};
use crate::SiteLensError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

const JOB_COLUMNS: &str = "id, url, status, error_message, title, html_version,
     h1_count, h2_count, h3_count, h4_count, h5_count, h6_count,
     has_login_form, crawled_at, created_at";

/// SQLite storage backend
pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobStore)` - Successfully opened/created database
    /// * `Err(SiteLensError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SiteLensError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SiteLensError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    fn current_status(&self, job_id: &str) -> StorageResult<JobStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;

        let status = status.ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;
        JobStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown status '{}'", status)))
    }

    /// Checks that `job_id` may move from its current status to `to`
    fn check_transition(&self, job_id: &str, to: JobStatus) -> StorageResult<JobStatus> {
        let from = self.current_status(job_id)?;
        if from.can_transition_to(to) {
            Ok(from)
        } else {
            Err(StorageError::InvalidTransition {
                job_id: job_id.to_string(),
                from,
                to,
            })
        }
    }

    fn load_links(&self, job_id: &str, kind: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT url FROM job_links WHERE job_id = ?1 AND kind = ?2 ORDER BY position",
        )?;
        let links = stmt
            .query_map(params![job_id, kind], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(links)
    }

    fn load_broken_links(&self, job_id: &str) -> StorageResult<Vec<BrokenLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, status_code, text FROM broken_links WHERE job_id = ?1 ORDER BY position",
        )?;
        let links = stmt
            .query_map(params![job_id], |row| {
                Ok(BrokenLink {
                    url: row.get(0)?,
                    status_code: row.get(1)?,
                    text: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    /// Fills in metadata for a completed job row
    fn attach_metadata(&self, row: JobRow) -> StorageResult<CrawlJob> {
        let mut job = row.job;
        if job.status == JobStatus::Completed {
            job.metadata = Some(ExtractedMetadata {
                title: row.title.unwrap_or_default(),
                html_version: row.html_version.unwrap_or_default(),
                heading_counts: HeadingCounts::from_array(row.headings),
                internal_links: self.load_links(&job.id, "internal")?,
                external_links: self.load_links(&job.id, "external")?,
                broken_links: self.load_broken_links(&job.id)?,
                has_login_form: row.has_login_form,
            });
        }
        Ok(job)
    }
}

/// A `crawl_jobs` row before links are loaded
struct JobRow {
    job: CrawlJob,
    title: Option<String>,
    html_version: Option<String>,
    headings: [u32; 6],
    has_login_form: bool,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get(2)?;
        let status = JobStatus::from_db_string(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown job status '{}'", status).into(),
            )
        })?;

        let mut headings = [0u32; 6];
        for (i, count) in headings.iter_mut().enumerate() {
            *count = row.get::<_, Option<u32>>(6 + i)?.unwrap_or(0);
        }

        Ok(Self {
            job: CrawlJob {
                id: row.get(0)?,
                url: row.get(1)?,
                status,
                error_message: row.get(3)?,
                metadata: None,
                crawled_at: parse_timestamp(row.get(13)?),
                created_at: parse_timestamp(row.get(14)?).unwrap_or_default(),
            },
            title: row.get(4)?,
            html_version: row.get(5)?,
            headings,
            has_login_form: row.get::<_, Option<bool>>(12)?.unwrap_or(false),
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| s.parse::<DateTime<Utc>>().ok())
}

impl JobStore for SqliteJobStore {
    // ===== Submission =====

    fn create_job(&mut self, url: &str) -> StorageResult<CrawlJob> {
        let now = Utc::now();
        let job = CrawlJob {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            status: JobStatus::Queued,
            error_message: None,
            metadata: None,
            crawled_at: None,
            created_at: now,
        };

        self.conn.execute(
            "INSERT INTO crawl_jobs (id, url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            params![job.id, job.url, job.status.to_db_string(), timestamp(now)],
        )?;

        Ok(job)
    }

    // ===== Pipeline Writes =====

    fn mark_running(&mut self, job_id: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Running)?;
        self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, error_message = NULL, updated_at = ?2 WHERE id = ?3",
            params![
                JobStatus::Running.to_db_string(),
                timestamp(Utc::now()),
                job_id
            ],
        )?;
        Ok(())
    }

    fn mark_completed(
        &mut self,
        job_id: &str,
        metadata: &ExtractedMetadata,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Completed)?;

        let tx = self.conn.transaction()?;
        let h = metadata.heading_counts;
        tx.execute(
            "UPDATE crawl_jobs SET status = ?1, error_message = NULL, title = ?2, html_version = ?3,
             h1_count = ?4, h2_count = ?5, h3_count = ?6, h4_count = ?7, h5_count = ?8, h6_count = ?9,
             has_login_form = ?10, crawled_at = ?11, updated_at = ?11 WHERE id = ?12",
            params![
                JobStatus::Completed.to_db_string(),
                metadata.title,
                metadata.html_version,
                h.h1,
                h.h2,
                h.h3,
                h.h4,
                h.h5,
                h.h6,
                metadata.has_login_form,
                timestamp(crawled_at),
                job_id
            ],
        )?;

        tx.execute("DELETE FROM job_links WHERE job_id = ?1", params![job_id])?;
        tx.execute("DELETE FROM broken_links WHERE job_id = ?1", params![job_id])?;
        {
            let mut insert_link = tx.prepare(
                "INSERT INTO job_links (job_id, kind, position, url) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (kind, links) in [
                ("internal", &metadata.internal_links),
                ("external", &metadata.external_links),
            ] {
                for (position, url) in links.iter().enumerate() {
                    insert_link.execute(params![job_id, kind, position as i64, url])?;
                }
            }

            let mut insert_broken = tx.prepare(
                "INSERT INTO broken_links (job_id, position, url, status_code, text) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, link) in metadata.broken_links.iter().enumerate() {
                insert_broken.execute(params![
                    job_id,
                    position as i64,
                    link.url,
                    link.status_code,
                    link.text
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn mark_error(&mut self, job_id: &str, message: &str) -> StorageResult<()> {
        self.check_transition(job_id, JobStatus::Error)?;
        self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, error_message = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                JobStatus::Error.to_db_string(),
                message,
                timestamp(Utc::now()),
                job_id
            ],
        )?;
        Ok(())
    }

    fn reset_to_queued(&mut self, job_id: &str) -> StorageResult<()> {
        let from = match self.current_status(job_id) {
            Ok(status) => status,
            Err(StorageError::JobNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        // finished jobs keep their outcome; use `requeue` to run them again
        if from.is_terminal() || !from.can_transition_to(JobStatus::Queued) {
            return Ok(());
        }

        self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                JobStatus::Queued.to_db_string(),
                timestamp(Utc::now()),
                job_id
            ],
        )?;
        Ok(())
    }

    fn requeue(&mut self, job_id: &str) -> StorageResult<()> {
        // Running -> Queued is a stop, not a re-run
        let from = self.current_status(job_id)?;
        if !from.is_terminal() || !from.can_transition_to(JobStatus::Queued) {
            return Err(StorageError::InvalidTransition {
                job_id: job_id.to_string(),
                from,
                to: JobStatus::Queued,
            });
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE crawl_jobs SET status = ?1, error_message = NULL, title = NULL, html_version = NULL,
             h1_count = NULL, h2_count = NULL, h3_count = NULL, h4_count = NULL, h5_count = NULL, h6_count = NULL,
             has_login_form = NULL, crawled_at = NULL, updated_at = ?2 WHERE id = ?3",
            params![
                JobStatus::Queued.to_db_string(),
                timestamp(Utc::now()),
                job_id
            ],
        )?;
        tx.execute("DELETE FROM job_links WHERE job_id = ?1", params![job_id])?;
        tx.execute("DELETE FROM broken_links WHERE job_id = ?1", params![job_id])?;
        tx.commit()?;

        Ok(())
    }

    // ===== Reads =====

    fn job_status(&self, job_id: &str) -> StorageResult<JobStatus> {
        self.current_status(job_id)
    }

    fn get_job(&self, job_id: &str) -> StorageResult<CrawlJob> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                JobRow::from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::JobNotFound(job_id.to_string()))?;

        self.attach_metadata(row)
    }

    fn list_jobs(&self, filter: &JobFilter) -> StorageResult<Vec<CrawlJob>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = filter.status {
            values.push(status.to_db_string().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            values.push(format!("%{}%", search));
            let n = values.len();
            clauses.push(format!("(url LIKE ?{n} OR title LIKE ?{n})"));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_jobs {} ORDER BY created_at DESC, rowid DESC",
            JOB_COLUMNS, where_clause
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| self.attach_metadata(row))
            .collect()
    }

    fn count_by_status(&self, status: JobStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_jobs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM crawl_jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Housekeeping =====

    fn delete_job(&mut self, job_id: &str) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM crawl_jobs WHERE id = ?1", params![job_id])?;
        Ok(deleted > 0)
    }
}
