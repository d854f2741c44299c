//! Public crawl API
//!
//! [`Crawler`] ties the store and a fetch adapter together and exposes
//! the run lifecycle: start, resume, pause, status, and results. It is
//! cheap to clone; a clone can pause a run another clone is driving.

use crate::config::validate_request;
use crate::crawler::scheduler::run_scheduler;
use crate::fetch::PageFetcher;
use crate::recorder::Recorder;
use crate::storage::{
    LogRecord, QueueItemRecord, QueueStats, QueueStore, RunRecord, RunStatus,
};
use crate::url::normalize;
use crate::{CrawlRequest, KumoError, Result};
use chrono::Duration;
use std::sync::Arc;

/// Claims older than this are treated as orphaned on resume
const STALE_CLAIM_HORIZON_MINUTES: i64 = 5;

/// A run's current status and queue counts
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunRecord,
    pub stats: QueueStats,
}

/// Everything a finished (or in-flight) run has produced
#[derive(Debug, Clone)]
pub struct CrawlResults {
    pub run: RunRecord,
    pub stats: QueueStats,
    pub pages: Vec<QueueItemRecord>,
    pub logs: Vec<LogRecord>,
}

/// Entry point for running and inspecting crawls
#[derive(Clone)]
pub struct Crawler {
    store: Arc<QueueStore>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Crawler {
    pub fn new(store: Arc<QueueStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Validates a request, creates a run, and drives it to rest.
    ///
    /// Blocks until the run completes, pauses, or fails. Returns the run
    /// id on completion or pause; a failed run surfaces as
    /// [`KumoError::RunFailed`] (its partial results stay queryable by
    /// the id embedded in the error).
    pub async fn start_crawl(&self, request: CrawlRequest) -> Result<i64> {
        validate_request(&request)?;

        let run_id = self.store.create_run(&request)?;
        let seed = normalize(&request.start_url);
        self.store.enqueue_seed(run_id, &seed)?;
        self.store.update_run_status(run_id, RunStatus::Running)?;

        let recorder = Recorder::new(self.store.clone(), run_id);
        recorder.info(
            "Crawl started",
            serde_json::json!({
                "start_url": seed,
                "max_depth": request.limits.max_depth,
                "max_pages": request.limits.max_pages,
                "concurrency": request.limits.concurrency,
            }),
        );

        run_scheduler(self.store.clone(), self.fetcher.clone(), run_id).await?;
        Ok(run_id)
    }

    /// Resumes a paused (or crash-interrupted) run.
    ///
    /// Stale `processing` claims are released back to `pending` first,
    /// so work orphaned by a dead process gets re-fetched. Runs in a
    /// terminal state are refused.
    pub async fn resume(&self, run_id: i64) -> Result<RunStatus> {
        let run = self.store.get_run(run_id)?;
        if run.status.is_terminal() {
            return Err(KumoError::InvalidRunState {
                run_id,
                status: run.status.to_db_string().to_string(),
                action: "resumed",
            });
        }

        let released = self
            .store
            .release_stale_claims(run_id, Duration::minutes(STALE_CLAIM_HORIZON_MINUTES))?;

        // a crash leaves the run 'running'; pending/paused need the transition
        if run.status != RunStatus::Running {
            self.store.update_run_status(run_id, RunStatus::Running)?;
        }

        let recorder = Recorder::new(self.store.clone(), run_id);
        recorder.info(
            "Crawl resumed",
            serde_json::json!({ "released_claims": released }),
        );

        run_scheduler(self.store.clone(), self.fetcher.clone(), run_id).await
    }

    /// Requests a pause. Only a running run can be paused; workers stop
    /// after finishing their in-flight pages.
    pub fn pause(&self, run_id: i64) -> Result<()> {
        let run = self.store.get_run(run_id)?;
        if run.status != RunStatus::Running {
            return Err(KumoError::InvalidRunState {
                run_id,
                status: run.status.to_db_string().to_string(),
                action: "paused",
            });
        }
        self.store.update_run_status(run_id, RunStatus::Paused)?;
        Ok(())
    }

    /// Current status and queue counts for a run.
    pub fn status(&self, run_id: i64) -> Result<RunReport> {
        let run = self.store.get_run(run_id)?;
        let stats = self.store.stats(run_id)?;
        Ok(RunReport { run, stats })
    }

    /// Full results for a run: pages, counts, and the event log.
    ///
    /// Page bodies are only loaded with `include_html`.
    pub fn get_results(&self, run_id: i64, include_html: bool) -> Result<CrawlResults> {
        let run = self.store.get_run(run_id)?;
        let stats = self.store.stats(run_id)?;
        let pages = self.store.list_items(run_id, include_html)?;
        let logs = self.store.list_logs(run_id)?;
        Ok(CrawlResults {
            run,
            stats,
            pages,
            logs,
        })
    }
}
