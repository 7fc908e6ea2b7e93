//! Task version data model
//!
//! A `Version` is one immutable snapshot of a task. Its storage key is the
//! SHA-256 of its canonical JSON serialization (serde field order, which is
//! fixed by the struct declaration), so the hash is carried in a field that
//! is never serialized and therefore never part of the hashed bytes.
//! Every mutation produces a fresh `Version` whose `parent` points at the
//! previous one; nothing is ever edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status assigned at task creation and duplication
pub const STATUS_PENDING: &str = "pending";

/// A named pointer from a version to an attachment blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub filename: String,
    /// Content hash of the blob in the object store
    pub hash: String,
}

/// One immutable snapshot of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Storage key of this version; filled in after store/resolve,
    /// never serialized
    #[serde(skip)]
    pub hash: String,
    pub task_id: Uuid,
    pub alias: String,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    /// Creation time of the task; copied unchanged into every later version
    pub created_at: DateTime<Utc>,
    pub archived: bool,
    /// Hash of the previous version; `None` only for the first version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Version {
    /// First version of a new task.
    pub fn new(
        task_id: Uuid,
        alias: String,
        description: String,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            hash: String::new(),
            task_id,
            alias,
            description,
            status: STATUS_PENDING.to_string(),
            deadline,
            attachments: Vec::new(),
            created_at: Utc::now(),
            archived: false,
            parent: None,
        }
    }

    /// Successor template: a copy of this version whose `parent` is this
    /// version's hash. Callers mutate the copy's fields, then store it.
    pub fn next(&self) -> Self {
        let mut next = self.clone();
        next.parent = Some(self.hash.clone());
        next.hash = String::new();
        next
    }

    /// Whether this is the first version of its task.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Most recent attachment entry with the given filename.
    pub fn find_attachment(&self, filename: &str) -> Option<&AttachmentRef> {
        self.attachments
            .iter()
            .rev()
            .find(|att| att.filename == filename)
    }

    /// Attachment filenames in insertion order.
    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(|att| att.filename.as_str())
            .collect()
    }
}
