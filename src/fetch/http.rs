//! Default reqwest-backed fetch adapter
//!
//! A thin [`PageFetcher`] implementation for crawls that do not need a
//! full scraping backend. It honors the settings' headers, timeout, and
//! retry count; proxy, geo, and JS rendering are backend features the
//! built-in adapter does not provide.

use crate::config::FetchSettings;
use crate::fetch::{FetchError, FetchedPage, PageFetcher};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Delay between retry attempts on transient failures
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Longest raw body sample kept on an error payload
const ERROR_BODY_SAMPLE: usize = 2048;

/// HTTP fetch adapter built on reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds the adapter with a shared HTTP client.
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    async fn attempt(
        &self,
        url: &str,
        settings: &FetchSettings,
    ) -> Result<FetchedPage, FetchError> {
        let mut request = self
            .client
            .get(url)
            .timeout(Duration::from_millis(settings.timeout_ms));

        for (name, value) in &settings.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(classify_error)?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(FetchError {
                message: format!("HTTP {}", status.as_u16()),
                status: Some(status.as_u16()),
                body: Some(diagnostic_body(&raw)),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::message(format!("Failed to read body: {}", e)))?;

        Ok(FetchedPage {
            status_code: status.as_u16(),
            final_url: Some(final_url),
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        settings: &FetchSettings,
    ) -> Result<FetchedPage, FetchError> {
        if settings.proxy.is_some() || settings.country.is_some() || settings.render_js {
            tracing::debug!(
                "proxy/geo/js settings are ignored by the built-in HTTP adapter for {}",
                url
            );
        }

        let attempts = settings.retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.attempt(url, settings).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    let transient = e.status.map_or(true, |s| s >= 500);
                    tracing::debug!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        e
                    );
                    last_error = Some(e);
                    if !transient || attempt == attempts {
                        break;
                    }
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }

        // attempts >= 1, so at least one error was recorded
        Err(last_error
            .unwrap_or_else(|| FetchError::message(format!("No fetch attempt made for {}", url))))
    }
}

/// Maps a reqwest error to a structured fetch error
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::message("Request timeout")
    } else if e.is_connect() {
        FetchError::message(format!("Connection failed: {}", e))
    } else {
        FetchError::message(e.to_string())
    }
}

/// Keeps a parseable JSON body as-is, otherwise a bounded raw sample
fn diagnostic_body(raw: &str) -> serde_json::Value {
    if raw.is_empty() {
        return serde_json::Value::Null;
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(v) => v,
        Err(_) => {
            let sample: String = raw.chars().take(ERROR_BODY_SAMPLE).collect();
            serde_json::Value::String(sample)
        }
    }
}
