//! Link and metadata extraction from fetched pages
//!
//! This module parses a page's HTML to extract:
//! - Links to follow (from <a> tags)
//! - The page title
//!
//! Extracted links are resolved against the page's final URL, normalized,
//! and partitioned into the set to enqueue and the set the run's scope
//! rules reject.

use crate::storage::RunRecord;
use crate::url::{normalize, should_process};
use scraper::{Html, Selector};
use url::Url;

/// Links found on one page, partitioned by the run's scope rules
#[derive(Debug, Clone, Default)]
pub struct DiscoveredLinks {
    /// Every valid absolute http(s) link on the page, deduplicated
    pub all: Vec<String>,

    /// The subset passing host and pattern filters; these get enqueued
    pub included: Vec<String>,

    /// The subset rejected by host or pattern filters
    pub ignored: Vec<String>,
}

/// Extracts the page title from the document's `<title>` tag.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts and partitions the links of one fetched page.
///
/// # Link Extraction Rules
///
/// **Skip outright:**
/// - empty hrefs and bare fragments (`#...`)
/// - `javascript:`, `mailto:`, `tel:`, and data URIs
/// - anything that does not resolve to an absolute http(s) URL
///
/// **Partition the rest:**
/// - links to other hosts are ignored unless the run crawls external
/// - include/exclude glob patterns decide the remainder
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The page's final URL (after redirects), used both for
///   resolving relative links and for the same-host check
/// * `run` - The run whose scope rules apply
pub fn extract_links(html: &str, page_url: &Url, run: &RunRecord) -> DiscoveredLinks {
    let document = Html::parse_document(html);
    let mut result = DiscoveredLinks::default();

    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return result,
    };

    let page_host = page_url.host_str();

    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let resolved = match page_url.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }

        let url = normalize(resolved.as_str());
        if result.all.contains(&url) {
            continue;
        }
        result.all.push(url.clone());

        let same_host = resolved.host_str() == page_host;
        let in_scope = (same_host || run.crawl_external)
            && should_process(&url, &run.include_patterns, &run.exclude_patterns);

        if in_scope {
            result.included.push(url);
        } else {
            result.ignored.push(url);
        }
    }

    result
}
