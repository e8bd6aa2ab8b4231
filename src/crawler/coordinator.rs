//! Crawl orchestrator - admission control and per-job pipeline
//!
//! The orchestrator owns the registry of executing jobs and runs each
//! admitted job on its own tokio task:
//!
//! 1. Load the job and mark it `Running`
//! 2. Fetch the page
//! 3. Analyze it (title, headings, links, login form)
//! 4. Probe a sample of discovered links
//! 5. Mark the job `Completed` with its metadata, or `Error` with a message
//!
//! Stages run strictly in sequence and nothing is retried. The registry slot
//! is released on every exit path.

use crate::config::CrawlSettings;
use crate::crawler::broken_links::check_sample;
use crate::crawler::fetcher::{build_http_client, fetch_document};
use crate::crawler::metadata::ExtractedMetadata;
use crate::crawler::parser::analyze_document;
use crate::crawler::registry::{ActiveCrawlRegistry, ActiveSlot};
use crate::state::JobStatus;
use crate::storage::{CrawlJob, JobStore, StorageError, StorageResult};
use crate::url::parse_target_url;
use crate::{AdmitError, ConfigError, SiteLensError};
use chrono::Utc;
use reqwest::Client;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// How often `wait_idle` re-checks the registry
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Admission-controlled crawl orchestrator
pub struct Orchestrator<S> {
    settings: Arc<CrawlSettings>,
    registry: Arc<ActiveCrawlRegistry>,
    store: Arc<Mutex<S>>,
    client: Client,
}

impl<S> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            client: self.client.clone(),
        }
    }
}

impl<S: JobStore + Send + 'static> Orchestrator<S> {
    /// Creates an orchestrator over a shared job store
    ///
    /// # Arguments
    ///
    /// * `settings` - Concurrency cap, fetch timeout and sampling size
    /// * `store` - Persistence for job records
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to admit jobs
    /// * `Err(SiteLensError)` - A zero concurrency cap, or the HTTP client could not be built
    pub fn new(settings: CrawlSettings, store: Arc<Mutex<S>>) -> Result<Self, SiteLensError> {
        if settings.max_concurrent_crawls == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_crawls must be greater than 0".to_string(),
            )
            .into());
        }
        let client = build_http_client(&settings.user_agent, settings.fetch_timeout)?;

        tracing::debug!(
            "Orchestrator ready: {} concurrent crawls, {:?} fetch timeout",
            settings.max_concurrent_crawls,
            settings.fetch_timeout
        );

        Ok(Self {
            registry: Arc::new(ActiveCrawlRegistry::new(settings.max_concurrent_crawls)),
            settings: Arc::new(settings),
            store,
            client,
        })
    }

    /// Shared handle to the job store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Validates `url` and creates a `Queued` job for it
    ///
    /// The job is not admitted; call [`Orchestrator::admit`] with its id.
    pub fn submit(&self, url: &str) -> Result<CrawlJob, SiteLensError> {
        parse_target_url(url)?;
        let job = self.with_store(|store| store.create_job(url.trim()))?;
        tracing::info!("Submitted job {} for {}", job.id, job.url);
        Ok(job)
    }

    /// Registers `job_id` and starts its pipeline on a new task
    ///
    /// Returns as soon as the job is registered. Must be called from within
    /// a tokio runtime. Only `Queued` jobs are started; a finished job has to
    /// be [re-queued](Orchestrator::requeue) first.
    ///
    /// # Errors
    ///
    /// * `AdmitError::AlreadyActive` - the job is already executing
    /// * `AdmitError::CapacityExceeded` - `max_concurrent_crawls` jobs are executing
    /// * `AdmitError::UnknownJob` - no such job in the store
    /// * `AdmitError::NotQueued` - the job is running or finished
    /// * `AdmitError::Lookup` - the store could not be read
    pub fn admit(&self, job_id: &str) -> Result<(), AdmitError> {
        let slot = self.registry.try_acquire(job_id)?;

        // the slot is released on each early return
        match self.with_store(|store| store.job_status(job_id)) {
            Ok(JobStatus::Queued) => {}
            Ok(status) => {
                return Err(AdmitError::NotQueued {
                    job_id: job_id.to_string(),
                    status,
                })
            }
            Err(StorageError::JobNotFound(_)) => {
                return Err(AdmitError::UnknownJob {
                    job_id: job_id.to_string(),
                })
            }
            Err(e) => {
                return Err(AdmitError::Lookup {
                    job_id: job_id.to_string(),
                    message: e.to_string(),
                })
            }
        }

        tracing::info!(
            "Admitted job {} ({}/{} active)",
            job_id,
            self.registry.len(),
            self.registry.capacity()
        );

        let this = self.clone();
        tokio::spawn(async move { this.supervise(slot).await });

        Ok(())
    }

    /// Admits each id in turn, collecting the ones that were refused
    ///
    /// A refusal does not stop the remaining ids from being admitted.
    pub fn admit_many<I, T>(&self, job_ids: I) -> Vec<(String, AdmitError)>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut refused = Vec::new();
        for job_id in job_ids {
            let job_id = job_id.as_ref();
            if let Err(e) = self.admit(job_id) {
                tracing::warn!("Failed to start crawl for ID {}: {}", job_id, e);
                refused.push((job_id.to_string(), e));
            }
        }
        refused
    }

    /// Stops tracking `job_id` and resets its status to `Queued`
    ///
    /// Any in-flight fetch or probe is not interrupted; the job's task may
    /// still record a final `Completed` or `Error` afterwards. Cancelling an
    /// id that is not executing does nothing and returns `Ok(false)`.
    pub fn cancel(&self, job_id: &str) -> Result<bool, SiteLensError> {
        if !self.registry.remove(job_id) {
            tracing::debug!("Cancel for inactive job {} ignored", job_id);
            return Ok(false);
        }

        self.with_store(|store| store.reset_to_queued(job_id))?;
        tracing::info!("Cancelled job {}", job_id);
        Ok(true)
    }

    /// Returns a finished job to `Queued`, discarding its previous outcome
    ///
    /// The job is not admitted; call [`Orchestrator::admit`] afterwards.
    pub fn requeue(&self, job_id: &str) -> Result<(), SiteLensError> {
        self.with_store(|store| store.requeue(job_id))?;
        tracing::info!("Re-queued job {}", job_id);
        Ok(())
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.registry.contains(job_id)
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Resolves once no job is registered as executing
    ///
    /// Cancelled jobs leave the registry immediately, so their tasks may
    /// still be finishing when this returns.
    pub async fn wait_idle(&self) {
        while !self.registry.is_empty() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    /// Runs the pipeline on a child task and holds the slot until it ends
    ///
    /// A panic inside the pipeline is caught at the join and recorded as a
    /// job error; the slot is dropped afterwards either way.
    async fn supervise(self, slot: ActiveSlot) {
        let job_id = slot.job_id().to_string();

        let worker = {
            let this = self.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { this.execute(&job_id).await })
        };

        if let Err(e) = worker.await {
            tracing::error!("Crawl task for job {} terminated abnormally: {}", job_id, e);
            if let Err(e) =
                self.with_store(|store| store.mark_error(&job_id, "crawl task terminated abnormally"))
            {
                tracing::error!("Failed to record abnormal exit for job {}: {}", job_id, e);
            }
        }

        drop(slot);
        tracing::debug!("Released slot for job {}", job_id);
    }

    /// Loads the job, runs every stage and commits the outcome
    async fn execute(&self, job_id: &str) {
        let job = match self.with_store(|store| store.get_job(job_id)) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Failed to find crawl job {}: {}", job_id, e);
                return;
            }
        };

        if let Err(e) = self.with_store(|store| store.mark_running(job_id)) {
            tracing::error!("Failed to mark job {} running: {}", job_id, e);
            return;
        }
        tracing::info!("Crawling {} (job {})", job.url, job_id);

        let outcome = match self.run_pipeline(&job.url).await {
            Ok(metadata) => {
                let result = self
                    .with_store(|store| store.mark_completed(job_id, &metadata, Utc::now()));
                match result {
                    Ok(()) => {
                        tracing::info!(
                            "Crawl completed for {}: {} internal, {} external, {} broken links",
                            job.url,
                            metadata.internal_links.len(),
                            metadata.external_links.len(),
                            metadata.broken_links.len()
                        );
                        return;
                    }
                    Err(e) => SiteLensError::from(e),
                }
            }
            Err(e) => e,
        };

        tracing::warn!("Crawl failed for {}: {}", job.url, outcome);
        if let Err(e) = self.with_store(|store| store.mark_error(job_id, &outcome.to_string())) {
            tracing::error!("Failed to record error for job {}: {}", job_id, e);
        }
    }

    /// Fetch, analyze and sample one page
    async fn run_pipeline(&self, url: &str) -> Result<ExtractedMetadata, SiteLensError> {
        let body = fetch_document(&self.client, url).await?;
        let signals = analyze_document(&body, url)?;
        tracing::debug!(
            "Analyzed {}: title {:?}, {} headings",
            url,
            signals.title,
            signals.heading_counts.total()
        );

        let (internal_links, external_links, anchor_text) = signals.links.into_parts();
        let broken_links = check_sample(
            &self.client,
            &internal_links,
            &external_links,
            &anchor_text,
            self.settings.broken_link_sample,
        )
        .await;

        Ok(ExtractedMetadata {
            title: signals.title,
            html_version: signals.html_version,
            heading_counts: signals.heading_counts,
            internal_links,
            external_links,
            broken_links,
            has_login_form: signals.has_login_form,
        })
    }

    /// Runs `f` with exclusive access to the store
    ///
    /// The lock is never held across an await point.
    fn with_store<T>(&self, f: impl FnOnce(&mut S) -> StorageResult<T>) -> StorageResult<T> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }
}
