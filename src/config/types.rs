use serde::Deserialize;
use std::time::Duration;

/// Default number of jobs allowed to execute at once
pub const DEFAULT_MAX_CONCURRENT_CRAWLS: usize = 5;

/// Default wall-clock budget for a single page fetch or link probe
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of discovered links probed for liveness per job
pub const DEFAULT_BROKEN_LINK_SAMPLE: usize = 10;

/// Main configuration structure for SiteLens
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of jobs executing at once
    #[serde(rename = "max-concurrent-crawls")]
    pub max_concurrent_crawls: usize,

    /// Timeout for the page fetch and for each broken-link probe (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Accepted but not consulted: each job processes exactly one page
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Accepted but not consulted: each job processes exactly one page
    #[serde(rename = "max-pages-per-domain", default = "default_max_pages_per_domain")]
    pub max_pages_per_domain: u32,

    /// How many discovered links are probed for liveness
    #[serde(rename = "broken-link-sample", default = "default_broken_link_sample")]
    pub broken_link_sample: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value as `Name/Version`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Persistence and report output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown report file
    #[serde(rename = "report-path", default = "default_report_path")]
    pub report_path: String,
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_pages_per_domain() -> u32 {
    100
}

fn default_broken_link_sample() -> usize {
    DEFAULT_BROKEN_LINK_SAMPLE
}

fn default_report_path() -> String {
    "./sitelens-report.md".to_string()
}

/// Runtime settings consumed by the orchestrator
///
/// `max_depth` and `max_pages_per_domain` are carried for recursive crawling
/// but the single-page pipeline never reads them.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub max_concurrent_crawls: usize,
    pub fetch_timeout: Duration,
    pub max_depth: u32,
    pub max_pages_per_domain: u32,
    pub broken_link_sample: usize,
    pub user_agent: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_concurrent_crawls: DEFAULT_MAX_CONCURRENT_CRAWLS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_depth: default_max_depth(),
            max_pages_per_domain: default_max_pages_per_domain(),
            broken_link_sample: DEFAULT_BROKEN_LINK_SAMPLE,
            user_agent: format!("SiteLens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_crawls: config.crawler.max_concurrent_crawls,
            fetch_timeout: Duration::from_secs(config.crawler.fetch_timeout_secs),
            max_depth: config.crawler.max_depth,
            max_pages_per_domain: config.crawler.max_pages_per_domain,
            broken_link_sample: config.crawler.broken_link_sample,
            user_agent: config.user_agent.header_value(),
        }
    }
}
