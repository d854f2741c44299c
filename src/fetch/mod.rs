//! Page fetching port
//!
//! The crawl core never talks HTTP directly: it depends on the
//! [`PageFetcher`] trait and only needs the three result fields a
//! scraping backend returns. A reqwest-backed default adapter lives in
//! [`http`]; production deployments can plug in anything else (headless
//! browsers, scraping APIs) by implementing the trait.

mod http;

pub use http::HttpFetcher;

use crate::config::FetchSettings;
use async_trait::async_trait;
use thiserror::Error;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code of the final response
    pub status_code: u16,

    /// Final URL after redirects, when known
    pub final_url: Option<String>,

    /// Response body
    pub body: String,
}

/// Structured fetch failure, recorded verbatim on the queue item
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    /// Human-readable description
    pub message: String,

    /// HTTP status, when the failure was an HTTP response
    pub status: Option<u16>,

    /// Response body for diagnostics: parsed JSON when possible,
    /// otherwise a raw string sample
    pub body: Option<serde_json::Value>,
}

impl FetchError {
    /// Creates an error with no HTTP context (network failure, timeout)
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Serializes the error into the structured payload stored on a
    /// failed queue item.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message,
            "status": self.status,
            "body": self.body,
        })
    }
}

/// The external scraping backend the crawler delegates fetching to.
///
/// Implementations own their retry policy; the core treats a returned
/// error as final for that queue item and counts it toward the run's
/// failure budget.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one URL with the run's opaque settings.
    async fn fetch(&self, url: &str, settings: &FetchSettings)
        -> Result<FetchedPage, FetchError>;
}
