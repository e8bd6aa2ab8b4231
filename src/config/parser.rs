use crate::config::types::{Config, CrawlSettings};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// A validated configuration with the values derived from it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Runtime view handed to the orchestrator
    pub settings: CrawlSettings,
    /// Hex SHA-256 over the effective crawl settings
    pub fingerprint: String,
}

/// Parses and validates configuration text
///
/// Keys left out of `[crawler]` take their defaults before validation runs.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads and validates the configuration file at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sitelens::config::load_config;
///
/// let config = load_config(Path::new("sitelens.toml")).unwrap();
/// println!("Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Loads the configuration and derives the orchestrator settings and fingerprint
///
/// # Returns
///
/// * `Ok(LoadedConfig)` - Configuration, settings and fingerprint
/// * `Err(ConfigError)` - The file could not be read, parsed or validated
pub fn load(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let config = load_config(path)?;
    let settings = CrawlSettings::from(&config);
    let fingerprint = settings_fingerprint(&settings, &config.storage.database_path);

    Ok(LoadedConfig {
        config,
        settings,
        fingerprint,
    })
}

/// Hashes the settings that influence crawl results
///
/// Two files that differ only in comments, layout, key order or in spelling
/// out a default share a fingerprint. The report path is not part of it.
pub fn settings_fingerprint(settings: &CrawlSettings, database_path: &str) -> String {
    let canonical = format!(
        "max-concurrent-crawls={}\nfetch-timeout-ms={}\nmax-depth={}\nmax-pages-per-domain={}\nbroken-link-sample={}\nuser-agent={}\ndatabase-path={}\n",
        settings.max_concurrent_crawls,
        settings.fetch_timeout.as_millis(),
        settings.max_depth,
        settings.max_pages_per_domain,
        settings.broken_link_sample,
        settings.user_agent,
        database_path,
    );

    hex::encode(Sha256::digest(canonical.as_bytes()))
}
