//! todo-orchestrator - Versioned Task Tracking Library
//!
//! A local, file-backed task tracker where every mutation is preserved as an
//! immutable, content-addressed version chained into a full history, with
//! deduplicated file attachments and a crash-safe single-writer lock.
//!
//! # Core Concepts
//!
//! - **Object store**: immutable blobs keyed by the SHA-256 of their bytes
//! - **Version chain**: every task edit is a new snapshot pointing at its
//!   predecessor; nothing is ever rewritten
//! - **Refs**: the only mutable state, one pointer per task to its current
//!   version, swapped atomically as the last step of each mutation
//! - **Store lock**: an exclusive marker file serializing writers across
//!   processes, with stale-lock diagnosis instead of silent takeover
//!
//! # Module Organization
//!
//! - `alias`: word-pair task aliases behind a pluggable uniqueness contract
//! - `chain`: version store/resolve and lazy history walking
//! - `config`: configuration loading from `.todo.toml`
//! - `error`: error types and result alias
//! - `lock`: store locking and atomic write helpers
//! - `object`: content-addressed object storage
//! - `orchestrator`: task operations and the history/query surface
//! - `refs`: mutable task-id to version-hash pointers
//! - `version`: the immutable task snapshot model

pub mod alias;
pub mod chain;
pub mod config;
pub mod error;
pub mod lock;
pub mod object;
pub mod orchestrator;
pub mod refs;
pub mod version;

pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, TaskUpdate};
pub use version::{AttachmentRef, Version};
