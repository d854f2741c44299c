//! Crawl orchestration
//!
//! This module contains the crawl engine:
//! - [`extractor`] parses fetched HTML for links and titles
//! - [`scheduler`] runs the worker pool over the durable queue
//! - [`api`] is the public entry point for starting, resuming,
//!   pausing, and inspecting runs

mod api;
mod extractor;
mod scheduler;

pub use api::{Crawler, CrawlResults, RunReport};
pub use extractor::{extract_links, extract_title, DiscoveredLinks};
pub use scheduler::MAX_RUN_FAILURES;
