//! Append-only, time-indexed history of processed notifications.
//!
//! Records are written by the external consumer and never updated or
//! deleted here. Range queries use an inclusive lower bound.

pub mod memory;

pub use memory::InMemoryHistory;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{NewHistoryRecord, NotificationEvent};

#[async_trait::async_trait]
pub trait EventHistory: Send + Sync {
    /// Append a record. The timestamp defaults to the insertion time.
    async fn insert(&self, record: NewHistoryRecord) -> Result<NotificationEvent>;

    /// Every record with `last_updated >= since`, oldest first, optionally
    /// restricted to one project.
    async fn query_after(
        &self,
        since: DateTime<Utc>,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>>;
}
