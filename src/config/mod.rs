//! Configuration module for SiteLens
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitelens::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitelens.toml")).unwrap();
//! println!("Concurrent crawls: {}", config.crawler.max_concurrent_crawls);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlSettings, CrawlerConfig, StorageConfig, UserAgentConfig,
    DEFAULT_BROKEN_LINK_SAMPLE, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENT_CRAWLS,
};

pub use parser::{load, load_config, parse_config, settings_fingerprint, LoadedConfig};
