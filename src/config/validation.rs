//! Crawl request validation
//!
//! Validation runs before any run state is created, so a bad request
//! fails synchronously without mutating the queue store.

use crate::config::CrawlRequest;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Maximum number of concurrent workers a run may ask for
pub const MAX_CONCURRENCY: u32 = 5;

/// Validates a crawl request.
///
/// Checks:
/// - the seed URL parses and uses http or https with a host
/// - concurrency is within 1..=5
/// - max_pages is at least 1
/// - patterns are non-empty strings
pub fn validate_request(request: &CrawlRequest) -> ConfigResult<()> {
    let url = Url::parse(&request.start_url)
        .map_err(|e| ConfigError::InvalidSeedUrl(format!("{}: {}", request.start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidSeedUrl(format!(
            "unsupported scheme {:?} in {}",
            url.scheme(),
            request.start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidSeedUrl(format!(
            "missing host in {}",
            request.start_url
        )));
    }

    let concurrency = request.limits.concurrency;
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, concurrency
        )));
    }

    if request.limits.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be at least 1".to_string(),
        ));
    }

    for pattern in request
        .include_patterns
        .iter()
        .chain(request.exclude_patterns.iter())
    {
        if pattern.trim().is_empty() {
            return Err(ConfigError::Validation(
                "URL patterns must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
