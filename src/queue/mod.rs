//! Pending notification queue.
//!
//! The queue holds at most one pending notification per dedup key (see
//! [`EventTarget::dedup_key`](crate::model::EventTarget::dedup_key)). The
//! check and the insert happen as one atomic step in every implementation.
//! Draining is done by an external consumer through [`EventQueue::list_all`]
//! and [`EventQueue::remove`].

pub mod memory;

pub use memory::InMemoryQueue;

use crate::error::Result;
use crate::model::{EventId, NewNotification, NotificationEvent};

/// Result of offering a notification to the queue.
#[derive(Debug)]
pub enum EnqueueOutcome {
    /// Admitted; this is the stored entry.
    Queued(Box<NotificationEvent>),
    /// An entry for the same target was already pending. Nothing was written.
    Duplicate { existing: EventId },
}

impl EnqueueOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, EnqueueOutcome::Duplicate { .. })
    }
}

#[async_trait::async_trait]
pub trait EventQueue: Send + Sync {
    /// Insert unless an entry with the same dedup key is already pending.
    async fn enqueue(&self, new: NewNotification) -> Result<EnqueueOutcome>;

    /// Queue the refresh-all broadcast under the same uniqueness rule.
    async fn enqueue_refresh_all(&self) -> Result<EnqueueOutcome> {
        self.enqueue(NewNotification::refresh_all()).await
    }

    /// Snapshot of pending entries, oldest first.
    async fn list_all(&self) -> Result<Vec<NotificationEvent>>;

    /// Remove an entry. Returns false if it was already gone.
    async fn remove(&self, id: EventId) -> Result<bool>;

    /// Number of pending entries.
    async fn len(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }
}
