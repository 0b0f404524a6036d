//! Audit trail domain model.
//!
//! # Responsibility
//! - Define the append-only audit entry attached to every mutation.
//! - Own the action-kind wire mapping shared by storage and backups.
//!
//! # Invariants
//! - Entries are immutable once created; there is no update or delete.
//! - Timestamps are monotonically non-decreasing in insertion order
//!   within a process.
//! - A trash restore is recorded as `ActionKind::Edit`; there is no
//!   dedicated RESTORE kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    /// A new item was added.
    Add,
    /// An item was edited in place. Also used for trash restores.
    Edit,
    /// An item was moved to the trash.
    Delete,
}

impl ActionKind {
    /// Wire/storage text for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
        }
    }

    /// Parses the wire/storage text back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADD" => Some(Self::Add),
            "EDIT" => Some(Self::Edit),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One immutable line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened.
    pub action: ActionKind,
    /// Authenticated identifier the mutation is attributed to.
    pub actor: String,
    /// Stamp issued by the store's monotonic clock.
    pub timestamp: DateTime<Utc>,
    /// Free-text description of the mutation.
    pub description: String,
}
