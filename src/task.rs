//! The task entity mirrored against the remote store.
//!
//! A `Task` carries the fields the client edits directly plus an open
//! attribute bag (`others`) for everything else the store knows about.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::codec;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_DELETED: &str = "deleted";
pub const STATUS_RECURRING: &str = "recurring";
pub const STATUS_WAITING: &str = "waiting";

/// Statuses that hide a task from the live list.
pub const HIDDEN_STATUSES: [&str; 4] = [
    STATUS_COMPLETED,
    STATUS_DELETED,
    STATUS_RECURRING,
    STATUS_WAITING,
];

/// Current time at the precision the wire format can carry.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub project: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub due: Option<DateTime<Utc>>,
    pub wait: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// User defined attributes and any other field without a named slot.
    pub others: BTreeMap<String, String>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub(crate) fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: STATUS_PENDING.to_string(),
            project: None,
            priority: None,
            tags: Vec::new(),
            created: now(),
            due: None,
            wait: None,
            modified: None,
            end: None,
            others: BTreeMap::new(),
        }
    }

    /// A blank description marks a task that was never filled in.
    pub fn is_unnamed(&self) -> bool {
        self.name.trim().is_empty()
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status == status
    }

    /// Timestamp after which a waiting task becomes pending.
    ///
    /// Prefers the first-class `wait` field and falls back to a raw `wait`
    /// attribute. Returns `None` when absent or unparseable.
    pub fn wait_attribute(&self) -> Option<DateTime<Utc>> {
        if let Some(wait) = self.wait {
            return Some(wait);
        }
        let raw = self.others.get("wait")?;
        if raw.trim().is_empty() {
            return None;
        }
        codec::parse_timestamp(raw).ok()
    }

    /// Short form of the identity used in listings.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}
