//! Durable queue storage for crawl runs
//!
//! This module persists all crawl state to SQLite, including:
//! - Run records with limits, patterns, and settings
//! - The work queue of discovered URLs with atomic claim semantics
//! - The append-only structured log
//!
//! The schema (three tables: `runs`, `queue_items`, `logs`) is a
//! compatibility contract: external dashboards and resumers read it
//! directly, so field names and status strings are stable.

mod queue;
mod schema;

pub use queue::QueueStore;
pub use schema::initialize_schema;

use crate::config::FetchSettings;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Queue item not found: {0}")]
    ItemNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Terminal states are sticky: no further run-level mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Whether a transition to `to` is allowed.
    ///
    /// Transitions are monotonic forward, except that a paused run may
    /// go back to running.
    pub fn can_transition(&self, to: RunStatus) -> bool {
        match (self, to) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Failed | Self::Canceled) => true,
            (Self::Running, Self::Paused) => true,
            (Self::Paused, Self::Running) => true,
            (Self::Running | Self::Paused, s) if s.is_terminal() => true,
            _ => false,
        }
    }
}

/// Status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl ItemStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

/// One crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub start_url: String,
    pub status: RunStatus,
    pub max_depth: u32,
    pub max_pages: u32,
    pub concurrency: u32,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub crawl_external: bool,
    pub settings: FetchSettings,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

/// One discovered URL's work record within a run
#[derive(Debug, Clone)]
pub struct QueueItemRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub status: ItemStatus,
    /// None only for the seed item
    pub parent_url: Option<String>,
    pub depth: u32,
    pub error: Option<serde_json::Value>,
    pub response_html: Option<String>,
    pub response_status_code: Option<u16>,
    pub response_final_url: Option<String>,
    pub page_title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One append-only log row
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub id: i64,
    pub run_id: i64,
    pub level: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

/// Per-status item counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub canceled: u64,
}
