//! Kumo-Sift: a resumable, depth-bounded web crawler with an HTML
//! reduction pipeline.
//!
//! The crawler half discovers pages reachable from a seed URL, fetches
//! each through a pluggable fetch adapter, extracts and filters outbound
//! links, and persists per-page results and structured logs to a durable
//! queue so runs can be paused, resumed, and recovered after a crash.
//!
//! The reduction half is a stateless DOM-simplification pipeline that
//! trims an HTML document into a compact representation plus a
//! structural outline.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod recorder;
pub mod reduce;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Kumo-Sift operations
#[derive(Debug, Error)]
pub enum KumoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Reduction error: {0}")]
    Reduce(#[from] ReduceError),

    #[error("Run {run_id} failed: {reason}")]
    RunFailed { run_id: i64, reason: String },

    #[error("Run {run_id} is {status} and cannot be {action}")]
    InvalidRunState {
        run_id: i64,
        status: String,
        action: &'static str,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidSeedUrl(String),
}

/// Errors produced by the HTML reduction pipeline
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Selector matched no element: {0}")]
    SelectorNoMatch(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),
}

/// Result type alias for Kumo-Sift operations
pub type Result<T> = std::result::Result<T, KumoError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlLimits, CrawlRequest, FetchSettings};
pub use crawler::{Crawler, DiscoveredLinks};
pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use recorder::Recorder;
pub use reduce::{reduce, ReduceOptions, Reduction};
pub use storage::{QueueStore, RunStatus};
pub use crate::url::{normalize, should_process};
