//! Configuration types

use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Depth, page, and concurrency limits for one crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlLimits {
    /// Maximum link-hops from the seed URL (0 = seed only)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of successfully processed pages
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Number of concurrent workers (1-5)
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> u32 {
    50
}

fn default_concurrency() -> u32 {
    1
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
        }
    }
}

/// Opaque fetch configuration forwarded to the fetch adapter.
///
/// The crawl core never interprets these fields beyond serializing them
/// onto the run record; the fetch adapter owns their meaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of retries the adapter performs on transient failures
    #[serde(default)]
    pub retries: u32,

    /// Proxy URL, if any
    #[serde(default)]
    pub proxy: Option<String>,

    /// Two-letter country code for geo-targeted fetching
    #[serde(default)]
    pub country: Option<String>,

    /// Whether the adapter should render JavaScript before returning
    #[serde(default)]
    pub render_js: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Everything needed to start one crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// The seed URL
    pub start_url: String,

    /// Depth/page/concurrency limits
    #[serde(default)]
    pub limits: CrawlLimits,

    /// Glob patterns a URL must match to be queued (empty = include all)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns that reject a URL; exclude always wins
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Whether to follow links to other hosts
    #[serde(default)]
    pub crawl_external: bool,

    /// Opaque fetch adapter settings
    #[serde(default)]
    pub settings: FetchSettings,
}

impl CrawlRequest {
    /// Creates a request for the given seed with default limits and settings
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            limits: CrawlLimits::default(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            crawl_external: false,
            settings: FetchSettings::default(),
        }
    }
}

/// On-disk crawl configuration: a [`CrawlRequest`] without the seed URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlFileConfig {
    #[serde(default)]
    pub limits: CrawlLimits,

    #[serde(default)]
    pub include_patterns: Vec<String>,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default)]
    pub crawl_external: bool,

    #[serde(default)]
    pub settings: FetchSettings,
}

impl CrawlFileConfig {
    /// Reads and parses a TOML configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Combines this file configuration with a seed URL
    pub fn into_request(self, start_url: &str) -> CrawlRequest {
        CrawlRequest {
            start_url: start_url.to_string(),
            limits: self.limits,
            include_patterns: self.include_patterns,
            exclude_patterns: self.exclude_patterns,
            crawl_external: self.crawl_external,
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_defaults() {
        let limits = CrawlLimits::default();
        assert_eq!(limits.max_depth, 2);
        assert_eq!(limits.max_pages, 50);
        assert_eq!(limits.concurrency, 1);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: CrawlFileConfig = toml::from_str("").unwrap();
        assert!(config.include_patterns.is_empty());
        assert!(!config.crawl_external);
        assert_eq!(config.limits.concurrency, 1);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
            crawl_external = true
            include_patterns = ["docs.example.com/**"]
            exclude_patterns = ["**.pdf", "**.zip"]

            [limits]
            max_depth = 3
            max_pages = 100
            concurrency = 4

            [settings]
            timeout_ms = 10000
            retries = 2
            country = "de"

            [settings.headers]
            "X-Custom" = "yes"
        "#;
        let config: CrawlFileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.limits.max_depth, 3);
        assert_eq!(config.limits.concurrency, 4);
        assert_eq!(config.exclude_patterns.len(), 2);
        assert_eq!(config.settings.retries, 2);
        assert_eq!(config.settings.country.as_deref(), Some("de"));
        assert_eq!(
            config.settings.headers.get("X-Custom").map(String::as_str),
            Some("yes")
        );
    }

    #[test]
    fn test_into_request_carries_fields() {
        let mut file = CrawlFileConfig::default();
        file.crawl_external = true;
        file.exclude_patterns.push("**.png".to_string());

        let request = file.into_request("https://example.com");
        assert_eq!(request.start_url, "https://example.com");
        assert!(request.crawl_external);
        assert_eq!(request.exclude_patterns, vec!["**.png".to_string()]);
    }

    #[test]
    fn test_settings_roundtrip_json() {
        let mut settings = FetchSettings::default();
        settings.retries = 3;
        settings.proxy = Some("http://proxy:8080".to_string());

        let json = serde_json::to_string(&settings).unwrap();
        let back: FetchSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.retries, 3);
        assert_eq!(back.proxy.as_deref(), Some("http://proxy:8080"));
    }
}
