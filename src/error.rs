//! Error types for todo-orchestrator
//!
//! Every failure the core can surface is a distinct variant so the caller
//! (the excluded CLI layer, or any other consumer) can report it without
//! inspecting the store. Lock acquisition is the only operation that retries
//! internally; everything else propagates immediately.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object corrupted: {hash} (stored bytes hash to {actual})")]
    ObjectCorrupted { hash: String, actual: String },

    #[error("Invalid object hash: {0}")]
    InvalidHash(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("No attachment named '{filename}' on task {task_id}")]
    AttachmentNotFound { task_id: Uuid, filename: String },

    #[error("Task {task_id} has no version {version} ({available} available)")]
    VersionNotFound {
        task_id: Uuid,
        version: usize,
        available: usize,
    },

    #[error("Lock contention on {0}")]
    LockContention(PathBuf),

    #[error("Stale lock at {path}: owner pid {pid} (acquired {acquired_at}) is no longer alive")]
    StaleLock {
        path: PathBuf,
        pid: u32,
        acquired_at: DateTime<Utc>,
    },

    #[error("Ref for task {task_id} points at a version of task {found}")]
    RefMismatch { task_id: Uuid, found: Uuid },

    #[error("History cycle detected at {0}")]
    HistoryCycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;
