//! Per-run structured event log
//!
//! Every operational event of a crawl (start, page outcomes, limit
//! hits, finalization) is appended to the run's `logs` table so a later
//! `status`/`results` call can replay what happened. Each entry is also
//! mirrored to the process-wide tracing subscriber.

use crate::storage::QueueStore;
use std::sync::Arc;

/// Appends structured log rows for one run
#[derive(Clone)]
pub struct Recorder {
    store: Arc<QueueStore>,
    run_id: i64,
}

impl Recorder {
    pub fn new(store: Arc<QueueStore>, run_id: i64) -> Self {
        Self { store, run_id }
    }

    pub fn debug(&self, message: &str, metadata: serde_json::Value) {
        tracing::debug!(run_id = self.run_id, "{}", message);
        self.append("debug", message, metadata);
    }

    pub fn info(&self, message: &str, metadata: serde_json::Value) {
        tracing::info!(run_id = self.run_id, "{}", message);
        self.append("info", message, metadata);
    }

    pub fn warn(&self, message: &str, metadata: serde_json::Value) {
        tracing::warn!(run_id = self.run_id, "{}", message);
        self.append("warn", message, metadata);
    }

    pub fn error(&self, message: &str, metadata: serde_json::Value) {
        tracing::error!(run_id = self.run_id, "{}", message);
        self.append("error", message, metadata);
    }

    /// Logging must never abort a crawl; a failed insert is only traced.
    fn append(&self, level: &str, message: &str, metadata: serde_json::Value) {
        if let Err(e) = self.store.insert_log(self.run_id, level, message, &metadata) {
            tracing::warn!(run_id = self.run_id, "Failed to persist log entry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlRequest;

    #[test]
    fn test_recorder_appends_rows() {
        let store = Arc::new(QueueStore::open_in_memory().unwrap());
        let run_id = store
            .create_run(&CrawlRequest::new("https://example.com"))
            .unwrap();

        let recorder = Recorder::new(store.clone(), run_id);
        recorder.info("Crawl started", serde_json::json!({"depth": 0}));
        recorder.warn("Page failed", serde_json::json!({"status": 503}));

        let logs = store.list_logs(run_id).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].level, "info");
        assert_eq!(logs[0].metadata["depth"], 0);
        assert_eq!(logs[1].level, "warn");
    }
}
