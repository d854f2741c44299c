//! Worker pool scheduler
//!
//! Drives a run's worker tasks over the durable queue until the queue
//! drains, a limit fires, or the run is paused. All coordination goes
//! through the store: workers claim items atomically and observe pause
//! and cancel requests between claims.

use crate::crawler::extractor::{extract_links, extract_title};
use crate::fetch::{FetchError, PageFetcher};
use crate::recorder::Recorder;
use crate::storage::{QueueItemRecord, QueueStore, RunRecord, RunStatus};
use crate::{KumoError, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// A run fails once it accumulates more than this many failed pages
pub const MAX_RUN_FAILURES: u32 = 10;

/// How long an idle worker waits before re-polling the queue
const POLL_DELAY: Duration = Duration::from_millis(250);

/// Ignored-link samples logged per page
const IGNORED_SAMPLE: usize = 20;

/// Shared state of one run's worker pool
struct CrawlContext {
    store: Arc<QueueStore>,
    fetcher: Arc<dyn PageFetcher>,
    recorder: Recorder,
    run_id: i64,
    max_depth: u32,
    max_pages: u32,
    /// Completed pages, seeded from the store so resume counts prior work
    processed: AtomicU32,
    /// Failed pages, same seeding
    failed: AtomicU32,
    /// Items currently claimed by this process's workers
    in_flight: AtomicU32,
    /// Set when a limit fires; workers stop claiming
    stopped: AtomicBool,
    /// First fatal reason, reported to the caller on a failed run
    fail_reason: Mutex<Option<String>>,
}

impl CrawlContext {
    fn fail_run(&self, reason: &str) {
        self.stopped.store(true, Ordering::SeqCst);
        {
            let mut slot = self.fail_reason.lock().unwrap();
            if slot.is_none() {
                *slot = Some(reason.to_string());
            }
        }
        if let Err(e) = self.store.update_run_status(self.run_id, RunStatus::Failed) {
            tracing::error!(run_id = self.run_id, "Failed to mark run failed: {}", e);
        }
        match self.store.cancel_remaining(self.run_id, reason) {
            Ok(canceled) => {
                self.recorder.error(
                    reason,
                    serde_json::json!({ "canceled_items": canceled }),
                );
            }
            Err(e) => {
                tracing::error!(run_id = self.run_id, "Failed to cancel queue: {}", e);
            }
        }
    }

    async fn process_item(&self, item: QueueItemRecord) -> Result<()> {
        let run = self.store.get_run(self.run_id)?;
        match self.fetcher.fetch(&item.url, &run.settings).await {
            Ok(page) => {
                self.handle_success(&run, &item, page.status_code, page.final_url, &page.body)
            }
            Err(e) => self.handle_failure(&item, e),
        }
    }

    fn handle_success(
        &self,
        run: &RunRecord,
        item: &QueueItemRecord,
        status_code: u16,
        final_url: Option<String>,
        body: &str,
    ) -> Result<()> {
        let final_url = final_url.unwrap_or_else(|| item.url.clone());
        let title = extract_title(body);

        let recorded = self.store.record_success(
            item.id,
            body,
            status_code,
            Some(&final_url),
            title.as_deref(),
        )?;
        if !recorded {
            // canceled while in flight
            return Ok(());
        }

        let page_url = Url::parse(&final_url)
            .or_else(|_| Url::parse(&item.url))
            .map_err(KumoError::UrlParse)?;
        let links = extract_links(body, &page_url, run);

        let mut enqueued = 0;
        if item.depth < self.max_depth && !links.included.is_empty() {
            enqueued = self
                .store
                .enqueue_links(self.run_id, &item.url, &links.included, item.depth + 1)?;
        }

        self.recorder.info(
            "Page crawled",
            serde_json::json!({
                "url": item.url,
                "depth": item.depth,
                "status": status_code,
                "links_found": links.all.len(),
                "enqueued": enqueued,
            }),
        );

        if item.depth == 0 && !links.ignored.is_empty() {
            let sample: Vec<&String> = links.ignored.iter().take(IGNORED_SAMPLE).collect();
            self.recorder.debug(
                "Links outside crawl scope",
                serde_json::json!({
                    "url": item.url,
                    "ignored": links.ignored.len(),
                    "sample": sample,
                }),
            );
        }

        let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if processed >= self.max_pages && !self.stopped.swap(true, Ordering::SeqCst) {
            let canceled = self.store.cancel_remaining(self.run_id, "Page limit reached")?;
            self.recorder.info(
                "Page limit reached",
                serde_json::json!({
                    "max_pages": self.max_pages,
                    "canceled_items": canceled,
                }),
            );
        }
        Ok(())
    }

    fn handle_failure(&self, item: &QueueItemRecord, error: FetchError) -> Result<()> {
        let recorded = self.store.record_failure(item.id, &error.to_payload())?;
        if !recorded {
            return Ok(());
        }

        self.recorder.warn(
            "Page failed",
            serde_json::json!({
                "url": item.url,
                "depth": item.depth,
                "error": error.to_payload(),
            }),
        );

        let failed = self.failed.fetch_add(1, Ordering::SeqCst) + 1;
        if failed > MAX_RUN_FAILURES {
            self.fail_run("Too many failed requests");
        }
        Ok(())
    }
}

async fn worker_loop(ctx: Arc<CrawlContext>) -> Result<()> {
    loop {
        if ctx.stopped.load(Ordering::SeqCst) {
            return Ok(());
        }
        // pause and external cancel are observed between claims
        let run = ctx.store.get_run(ctx.run_id)?;
        if run.status != RunStatus::Running {
            return Ok(());
        }

        // counted before the claim so an idle sibling never observes a
        // claimed item outside in_flight
        ctx.in_flight.fetch_add(1, Ordering::SeqCst);
        let claimed = ctx.store.claim_next(ctx.run_id);
        match claimed {
            Ok(Some(item)) => {
                let outcome = ctx.process_item(item).await;
                ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
                outcome?;
            }
            Ok(None) => {
                ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
                let stats = ctx.store.stats(ctx.run_id)?;
                // processing rows orphaned by a dead process don't count;
                // finalization settles them
                if stats.pending == 0 && ctx.in_flight.load(Ordering::SeqCst) == 0 {
                    return Ok(());
                }
                // a sibling's claim may still spawn new links
                tokio::time::sleep(POLL_DELAY).await;
            }
            Err(e) => {
                ctx.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(e.into());
            }
        }
    }
}

/// Runs a run's worker pool to completion and finalizes the run record.
///
/// Returns the run's final status. A run that ends `failed` surfaces as
/// [`KumoError::RunFailed`]; a pause is a normal return.
pub(crate) async fn run_scheduler(
    store: Arc<QueueStore>,
    fetcher: Arc<dyn PageFetcher>,
    run_id: i64,
) -> Result<RunStatus> {
    let run = store.get_run(run_id)?;
    let stats = store.stats(run_id)?;

    let ctx = Arc::new(CrawlContext {
        store: store.clone(),
        fetcher,
        recorder: Recorder::new(store.clone(), run_id),
        run_id,
        max_depth: run.max_depth,
        max_pages: run.max_pages,
        processed: AtomicU32::new(stats.completed as u32),
        failed: AtomicU32::new(stats.failed as u32),
        in_flight: AtomicU32::new(0),
        stopped: AtomicBool::new(false),
        fail_reason: Mutex::new(None),
    });

    let workers: Vec<_> = (0..run.concurrency.max(1))
        .map(|_| tokio::spawn(worker_loop(ctx.clone())))
        .collect();

    let mut worker_error = None;
    for worker in workers {
        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(e) => Err(KumoError::Worker(e.to_string())),
        };
        if let Err(e) = outcome {
            if worker_error.is_none() {
                worker_error = Some(e);
            }
        }
    }

    // cleanup runs on every exit path, including worker errors
    if let Some(error) = worker_error {
        if let Err(e) = ctx.store.cancel_remaining(run_id, &error.to_string()) {
            tracing::error!(run_id, "Failed to cancel queue after worker error: {}", e);
        }
        if let Err(e) = ctx.store.update_run_status(run_id, RunStatus::Failed) {
            tracing::error!(run_id, "Failed to mark run failed: {}", e);
        }
        ctx.recorder
            .error("Crawl aborted", serde_json::json!({ "error": error.to_string() }));
        return Err(error);
    }

    finalize(&ctx)
}

/// Settles the run record once all workers have exited.
fn finalize(ctx: &CrawlContext) -> Result<RunStatus> {
    let run = ctx.store.get_run(ctx.run_id)?;

    match run.status {
        // leave the queue intact so resume picks up where we stopped
        RunStatus::Paused => {
            let stats = ctx.store.stats(ctx.run_id)?;
            ctx.recorder.info(
                "Run paused",
                serde_json::json!({
                    "completed": stats.completed,
                    "pending": stats.pending,
                }),
            );
            Ok(RunStatus::Paused)
        }
        RunStatus::Failed => {
            let reason = ctx
                .fail_reason
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "Run failed".to_string());
            Err(KumoError::RunFailed {
                run_id: ctx.run_id,
                reason,
            })
        }
        RunStatus::Canceled => Ok(RunStatus::Canceled),
        _ => {
            // drained queue or page limit: settle leftovers and the verdict
            ctx.store.cancel_remaining(ctx.run_id, "run ended")?;
            let stats = ctx.store.stats(ctx.run_id)?;
            if stats.completed > 0 {
                ctx.store.update_run_status(ctx.run_id, RunStatus::Completed)?;
                ctx.recorder.info(
                    "Crawl finished",
                    serde_json::json!({
                        "completed": stats.completed,
                        "failed": stats.failed,
                        "canceled": stats.canceled,
                    }),
                );
                Ok(RunStatus::Completed)
            } else {
                let reason = "No pages completed".to_string();
                ctx.store.update_run_status(ctx.run_id, RunStatus::Failed)?;
                ctx.recorder.error(&reason, serde_json::json!({ "failed": stats.failed }));
                Err(KumoError::RunFailed {
                    run_id: ctx.run_id,
                    reason,
                })
            }
        }
    }
}
