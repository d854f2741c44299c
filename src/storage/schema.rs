//! Database schema definition and initialization

use rusqlite::Connection;

use super::StorageResult;

/// SQL schema for the crawl database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    max_depth INTEGER NOT NULL,
    max_pages INTEGER NOT NULL,
    concurrency INTEGER NOT NULL,
    include_patterns TEXT NOT NULL DEFAULT '[]',
    exclude_patterns TEXT NOT NULL DEFAULT '[]',
    crawl_external INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS queue_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    parent_url TEXT,
    depth INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    response_html TEXT,
    response_status_code INTEGER,
    response_final_url TEXT,
    page_title TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_queue_items_run_status
    ON queue_items(run_id, status);

CREATE INDEX IF NOT EXISTS idx_queue_items_claim
    ON queue_items(run_id, status, depth, id);

CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_logs_run ON logs(run_id);
"#;

/// Initializes the database schema.
///
/// Safe to call on every open: all statements are `IF NOT EXISTS`.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
