//! Crawl configuration for Kumo-Sift
//!
//! A crawl is described by a [`CrawlRequest`]: the seed URL, limits,
//! include/exclude patterns, and opaque fetch settings forwarded to the
//! fetch adapter. Requests can be built programmatically or loaded from
//! a TOML file and validated before any run state is created.

mod types;
mod validation;

pub use types::{CrawlFileConfig, CrawlLimits, CrawlRequest, FetchSettings};
pub use validation::validate_request;

use crate::ConfigResult;
use std::path::Path;

/// Loads a crawl configuration file and combines it with a seed URL.
///
/// The file carries everything except the seed (limits, patterns,
/// fetch settings), so one file can drive crawls of many sites.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
/// * `start_url` - The seed URL for this crawl
pub fn load_request(path: &Path, start_url: &str) -> ConfigResult<CrawlRequest> {
    let file = CrawlFileConfig::load(path)?;
    let request = file.into_request(start_url);
    validate_request(&request)?;
    Ok(request)
}
