//! Core data model.
//!
//! A notification event says "this coordinate changed". While pending it lives
//! in the queue; once processed, a separate record of it lives in history.
//! Where an event is stored is its status; there is no status field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// The (group, artifact, version) triple identifying a publishable unit.
///
/// Equality is structural and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
        }
    }

    /// True if any of the three fields is empty.
    pub fn has_empty_field(&self) -> bool {
        self.group_id.is_empty() || self.artifact_id.is_empty() || self.version_id.is_empty()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version_id)
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// What a notification is about: one project coordinate, or every project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventTarget {
    Specific {
        project_id: String,
        coordinate: Coordinate,
    },
    RefreshAll,
}

/// Dedup key reserved for the refresh-all broadcast.
pub(crate) const REFRESH_ALL_KEY: &str = "*";

impl EventTarget {
    pub fn specific(project_id: impl Into<String>, coordinate: Coordinate) -> Self {
        EventTarget::Specific {
            project_id: project_id.into(),
            coordinate,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            EventTarget::Specific { project_id, .. } => Some(project_id),
            EventTarget::RefreshAll => None,
        }
    }

    pub fn coordinate(&self) -> Option<&Coordinate> {
        match self {
            EventTarget::Specific { coordinate, .. } => Some(coordinate),
            EventTarget::RefreshAll => None,
        }
    }

    pub fn is_refresh_all(&self) -> bool {
        matches!(self, EventTarget::RefreshAll)
    }

    /// Key under which at most one pending notification may exist.
    ///
    /// Only the coordinate takes part; the project id does not. Fields are
    /// length-prefixed so no two distinct coordinates share a key, and no
    /// coordinate key can equal the refresh-all key.
    pub fn dedup_key(&self) -> String {
        match self {
            EventTarget::Specific { coordinate, .. } => format!(
                "{}:{}{}:{}{}:{}",
                coordinate.group_id.len(),
                coordinate.group_id,
                coordinate.artifact_id.len(),
                coordinate.artifact_id,
                coordinate.version_id.len(),
                coordinate.version_id,
            ),
            EventTarget::RefreshAll => REFRESH_ALL_KEY.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EventTarget::Specific { .. } => "specific",
            EventTarget::RefreshAll => "refresh_all",
        }
    }
}

impl std::fmt::Display for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventTarget::Specific {
                project_id,
                coordinate,
            } => write!(f, "{project_id} ({coordinate})"),
            EventTarget::RefreshAll => write!(f, "refresh-all"),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification Event
// ---------------------------------------------------------------------------

/// Newtype for store-assigned event record IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// A notification, either pending in the queue or recorded in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Assigned by whichever store holds the record.
    pub id: EventId,

    pub target: EventTarget,

    /// Caller-supplied correlation id, e.g. linking a retry to the request
    /// that caused it.
    pub event_id: Option<i64>,

    /// Creation time in the queue, insertion (or supplied) time in history.
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A notification to be admitted into the queue.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub(crate) target: EventTarget,
    pub(crate) event_id: Option<i64>,
}

impl NewNotification {
    pub fn for_coordinate(project_id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            target: EventTarget::specific(project_id, coordinate),
            event_id: None,
        }
    }

    pub fn refresh_all() -> Self {
        Self {
            target: EventTarget::RefreshAll,
            event_id: None,
        }
    }

    /// Offer a previously pending event to the queue again, keeping its
    /// target and correlation id.
    pub fn requeue(event: &NotificationEvent) -> Self {
        Self {
            target: event.target.clone(),
            event_id: event.event_id,
        }
    }

    pub fn event_id(mut self, event_id: i64) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn target(&self) -> &EventTarget {
        &self.target
    }
}

/// How the correlation id of a history record is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryIdPolicy {
    /// Copy the queued event's correlation id.
    #[default]
    ReuseEventId,
    /// Let the history store mint a fresh one from its own sequence.
    MintNew,
}

impl std::fmt::Display for HistoryIdPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HistoryIdPolicy::ReuseEventId => "reuse",
            HistoryIdPolicy::MintNew => "mint",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for HistoryIdPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reuse" => Ok(HistoryIdPolicy::ReuseEventId),
            "mint" => Ok(HistoryIdPolicy::MintNew),
            other => Err(Error::Config(format!("unknown history id policy: {other}"))),
        }
    }
}

/// Correlation id of a record about to be written to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEventId {
    Keep(Option<i64>),
    Mint,
}

/// A record to be appended to history.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub(crate) target: EventTarget,
    pub(crate) event_id: HistoryEventId,
    pub(crate) last_updated: Option<DateTime<Utc>>,
}

impl NewHistoryRecord {
    pub fn new(target: EventTarget) -> Self {
        Self {
            target,
            event_id: HistoryEventId::Keep(None),
            last_updated: None,
        }
    }

    /// Build the history record for a queued event the consumer has processed.
    pub fn from_processed(event: &NotificationEvent, policy: HistoryIdPolicy) -> Self {
        let event_id = match policy {
            HistoryIdPolicy::ReuseEventId => HistoryEventId::Keep(event.event_id),
            HistoryIdPolicy::MintNew => HistoryEventId::Mint,
        };
        Self {
            target: event.target.clone(),
            event_id,
            last_updated: None,
        }
    }

    pub fn event_id(mut self, event_id: i64) -> Self {
        self.event_id = HistoryEventId::Keep(Some(event_id));
        self
    }

    /// Pin the record's timestamp instead of using the insertion time.
    pub fn last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A project as known to the project registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
}

impl ProjectRecord {
    pub fn new(
        project_id: impl Into<String>,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}
