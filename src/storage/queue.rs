//! SQLite-backed run and queue store
//!
//! One [`QueueStore`] is shared between all workers of a run (and
//! between concurrent runs). The connection sits behind a mutex, so
//! every operation is a single serialized transaction and `claim_next`
//! hands each pending item to exactly one worker.

use crate::config::{CrawlRequest, FetchSettings};
use crate::storage::schema::initialize_schema;
use crate::storage::{
    ItemStatus, LogRecord, QueueItemRecord, QueueStats, RunRecord, RunStatus, StorageError,
    StorageResult,
};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Column list shared by every query that materializes a [`QueueItemRecord`]
const ITEM_COLUMNS: &str = "id, run_id, url, status, parent_url, depth, error, \
     response_html, response_status_code, response_final_url, page_title, \
     created_at, updated_at";

/// SQLite store for runs, queue items, and logs
pub struct QueueStore {
    conn: Mutex<Connection>,
}

impl QueueStore {
    /// Opens (or creates) the crawl database at the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing and dry runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ===== Run Management =====

    /// Creates a new run in `pending` state from a validated request.
    pub fn create_run(&self, request: &CrawlRequest) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let include = serde_json::to_string(&request.include_patterns)?;
        let exclude = serde_json::to_string(&request.exclude_patterns)?;
        let settings = serde_json::to_string(&request.settings)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO runs (start_url, status, max_depth, max_pages, concurrency,
                               include_patterns, exclude_patterns, crawl_external,
                               settings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                request.start_url,
                RunStatus::Pending.to_db_string(),
                request.limits.max_depth,
                request.limits.max_pages,
                request.limits.concurrency,
                include,
                exclude,
                request.crawl_external,
                settings,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetches one run record.
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, start_url, status, max_depth, max_pages, concurrency,
                    include_patterns, exclude_patterns, crawl_external, settings,
                    created_at, updated_at, completed_at
             FROM runs WHERE id = ?1",
        )?;

        let run = stmt
            .query_row(params![run_id], map_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        Ok(run)
    }

    /// Applies a run status transition.
    ///
    /// Returns `Ok(true)` if the transition was applied, `Ok(false)` if
    /// the current status refuses it (terminal states are sticky, and
    /// transitions are monotonic except paused <-> running). The check
    /// and the update happen under one lock, so concurrent finalizers
    /// cannot both win.
    pub fn update_run_status(&self, run_id: i64, status: RunStatus) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();

        let current: String = conn
            .query_row(
                "SELECT status FROM runs WHERE id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        let current = RunStatus::from_db_string(&current).unwrap_or(RunStatus::Failed);
        if !current.can_transition(status) {
            return Ok(false);
        }

        if status.is_terminal() {
            conn.execute(
                "UPDATE runs SET status = ?1, updated_at = ?2, completed_at = ?2 WHERE id = ?3",
                params![status.to_db_string(), now, run_id],
            )?;
        } else {
            conn.execute(
                "UPDATE runs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_db_string(), now, run_id],
            )?;
        }
        Ok(true)
    }

    // ===== Queue Management =====

    /// Inserts the seed URL as the run's depth-0 queue item.
    pub fn enqueue_seed(&self, run_id: i64, url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO queue_items (run_id, url, status, depth, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            params![run_id, url, ItemStatus::Pending.to_db_string(), now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Atomically claims the next pending item for a worker.
    ///
    /// Selection order is shallowest depth first, then insertion order,
    /// so the crawl stays breadth-first regardless of worker count.
    /// Returns `None` when no pending item exists.
    pub fn claim_next(&self, run_id: i64) -> StorageResult<Option<QueueItemRecord>> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "UPDATE queue_items SET status = ?1, updated_at = ?2
             WHERE id = (
                 SELECT id FROM queue_items
                 WHERE run_id = ?3 AND status = ?4
                 ORDER BY depth ASC, id ASC
                 LIMIT 1
             )
             RETURNING {ITEM_COLUMNS}"
        );
        let item = conn
            .query_row(
                &sql,
                params![
                    ItemStatus::Processing.to_db_string(),
                    now,
                    run_id,
                    ItemStatus::Pending.to_db_string(),
                ],
                map_item,
            )
            .optional()?;
        Ok(item)
    }

    /// Records a successful fetch on a claimed item.
    ///
    /// Only items still in `processing` are updated; returns whether the
    /// write happened. A canceled item stays canceled even if its worker
    /// reports late.
    pub fn record_success(
        &self,
        item_id: i64,
        html: &str,
        status_code: u16,
        final_url: Option<&str>,
        page_title: Option<&str>,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE queue_items
             SET status = ?1, response_html = ?2, response_status_code = ?3,
                 response_final_url = ?4, page_title = ?5, updated_at = ?6
             WHERE id = ?7 AND status = ?8",
            params![
                ItemStatus::Completed.to_db_string(),
                html,
                status_code,
                final_url,
                page_title,
                now,
                item_id,
                ItemStatus::Processing.to_db_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Records a failed fetch on a claimed item, with a structured error
    /// payload. Same late-report guard as [`record_success`].
    ///
    /// [`record_success`]: QueueStore::record_success
    pub fn record_failure(
        &self,
        item_id: i64,
        error: &serde_json::Value,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let error_json = serde_json::to_string(error)?;
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE queue_items SET status = ?1, error = ?2, updated_at = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                ItemStatus::Failed.to_db_string(),
                error_json,
                now,
                item_id,
                ItemStatus::Processing.to_db_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Enqueues discovered links at the given depth, in one transaction.
    ///
    /// URLs already present in the run (any status) are skipped via the
    /// `UNIQUE(run_id, url)` constraint. Returns the number actually
    /// inserted.
    pub fn enqueue_links(
        &self,
        run_id: i64,
        parent_url: &str,
        urls: &[String],
        depth: u32,
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO queue_items
                     (run_id, url, status, parent_url, depth, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            )?;
            for url in urls {
                inserted += stmt.execute(params![
                    run_id,
                    url,
                    ItemStatus::Pending.to_db_string(),
                    parent_url,
                    depth,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Per-status item counts for a run.
    pub fn stats(&self, run_id: i64) -> StorageResult<QueueStats> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM queue_items WHERE run_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut stats = QueueStats::default();
        for row in rows {
            let (status, count) = row?;
            stats.total += count;
            match ItemStatus::from_db_string(&status) {
                Some(ItemStatus::Pending) => stats.pending = count,
                Some(ItemStatus::Processing) => stats.processing = count,
                Some(ItemStatus::Completed) => stats.completed = count,
                Some(ItemStatus::Failed) => stats.failed = count,
                Some(ItemStatus::Canceled) => stats.canceled = count,
                None => {}
            }
        }
        Ok(stats)
    }

    /// Cancels every pending and processing item of a run, recording the
    /// reason on each. Run status is untouched; the scheduler owns that.
    /// Returns the number of items canceled.
    pub fn cancel_remaining(&self, run_id: i64, reason: &str) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let error_json = serde_json::to_string(&serde_json::json!({
            "message": reason,
            "canceled": true,
        }))?;
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE queue_items SET status = ?1, error = ?2, updated_at = ?3
             WHERE run_id = ?4 AND status IN (?5, ?6)",
            params![
                ItemStatus::Canceled.to_db_string(),
                error_json,
                now,
                run_id,
                ItemStatus::Pending.to_db_string(),
                ItemStatus::Processing.to_db_string(),
            ],
        )?;
        Ok(changed)
    }

    /// Returns stale `processing` claims to `pending`.
    ///
    /// Used on resume: items claimed by a worker that died (crash, kill)
    /// stay `processing` forever otherwise. Anything not touched within
    /// `max_age` is assumed orphaned.
    pub fn release_stale_claims(&self, run_id: i64, max_age: Duration) -> StorageResult<usize> {
        let now = Utc::now();
        let cutoff = (now - max_age).to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE queue_items SET status = ?1, updated_at = ?2
             WHERE run_id = ?3 AND status = ?4 AND updated_at < ?5",
            params![
                ItemStatus::Pending.to_db_string(),
                now.to_rfc3339(),
                run_id,
                ItemStatus::Processing.to_db_string(),
                cutoff,
            ],
        )?;
        Ok(changed)
    }

    /// Lists a run's queue items in insertion order.
    ///
    /// With `include_html` false the (potentially large) response bodies
    /// are left out of the records.
    pub fn list_items(
        &self,
        run_id: i64,
        include_html: bool,
    ) -> StorageResult<Vec<QueueItemRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = if include_html {
            format!("SELECT {ITEM_COLUMNS} FROM queue_items WHERE run_id = ?1 ORDER BY id ASC")
        } else {
            format!(
                "SELECT {} FROM queue_items WHERE run_id = ?1 ORDER BY id ASC",
                ITEM_COLUMNS.replace("response_html", "NULL AS response_html")
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![run_id], map_item)?;
        rows.map(|r| r.map_err(StorageError::from)).collect()
    }

    /// Fetches one queue item by id.
    pub fn get_item(&self, item_id: i64) -> StorageResult<QueueItemRecord> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM queue_items WHERE id = ?1");
        conn.query_row(&sql, params![item_id], map_item)
            .optional()?
            .ok_or(StorageError::ItemNotFound(item_id))
    }

    // ===== Log Management =====

    /// Appends a structured log row for a run.
    pub fn insert_log(
        &self,
        run_id: i64,
        level: &str,
        message: &str,
        metadata: &serde_json::Value,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(metadata)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO logs (run_id, level, message, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, level, message, metadata_json, now],
        )?;
        Ok(())
    }

    /// Lists a run's log rows in insertion order.
    pub fn list_logs(&self, run_id: i64) -> StorageResult<Vec<LogRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, run_id, level, message, metadata, created_at
             FROM logs WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            let metadata: Option<String> = row.get(4)?;
            Ok(LogRecord {
                id: row.get(0)?,
                run_id: row.get(1)?,
                level: row.get(2)?,
                message: row.get(3)?,
                metadata: metadata
                    .and_then(|m| serde_json::from_str(&m).ok())
                    .unwrap_or(serde_json::Value::Null),
                created_at: row.get(5)?,
            })
        })?;
        rows.map(|r| r.map_err(StorageError::from)).collect()
    }
}

fn map_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let include: String = row.get(6)?;
    let exclude: String = row.get(7)?;
    let settings: String = row.get(9)?;
    Ok(RunRecord {
        id: row.get(0)?,
        start_url: row.get(1)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(2)?)
            .unwrap_or(RunStatus::Failed),
        max_depth: row.get(3)?,
        max_pages: row.get(4)?,
        concurrency: row.get(5)?,
        include_patterns: serde_json::from_str(&include).unwrap_or_default(),
        exclude_patterns: serde_json::from_str(&exclude).unwrap_or_default(),
        crawl_external: row.get(8)?,
        settings: serde_json::from_str::<FetchSettings>(&settings).unwrap_or_default(),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

fn map_item(row: &Row<'_>) -> rusqlite::Result<QueueItemRecord> {
    let error: Option<String> = row.get(6)?;
    Ok(QueueItemRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        url: row.get(2)?,
        status: ItemStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(ItemStatus::Failed),
        parent_url: row.get(4)?,
        depth: row.get(5)?,
        error: error.and_then(|e| serde_json::from_str(&e).ok()),
        response_html: row.get(7)?,
        response_status_code: row.get(8)?,
        response_final_url: row.get(9)?,
        page_title: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
