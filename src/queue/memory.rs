//! Ephemeral in-memory implementation of [EventQueue].

use super::{EnqueueOutcome, EventQueue};
use crate::error::Result;
use crate::model::{EventId, NewNotification, NotificationEvent};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Inner {
    entries: VecDeque<NotificationEvent>,
    /// dedup key -> pending entry
    keys: HashMap<String, EventId>,
}

/// FIFO queue guarded by a single mutex.
#[derive(Default)]
pub struct InMemoryQueue {
    inner: Mutex<Inner>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventQueue for InMemoryQueue {
    async fn enqueue(&self, new: NewNotification) -> Result<EnqueueOutcome> {
        let key = new.target.dedup_key();
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.keys.get(&key) {
            return Ok(EnqueueOutcome::Duplicate {
                existing: *existing,
            });
        }

        let event = NotificationEvent {
            id: EventId::new(),
            target: new.target,
            event_id: new.event_id,
            last_updated: chrono::Utc::now(),
        };
        inner.keys.insert(key, event.id);
        inner.entries.push_back(event.clone());
        debug!(id = %event.id, target = %event.target, "queued");

        Ok(EnqueueOutcome::Queued(Box::new(event)))
    }

    async fn list_all(&self) -> Result<Vec<NotificationEvent>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.iter().cloned().collect())
    }

    async fn remove(&self, id: EventId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        let removed = inner.entries.remove(pos);
        if let Some(event) = removed {
            inner.keys.remove(&event.target.dedup_key());
        }

        metrics::queue_removals().add(1, &[KeyValue::new("backend", "memory")]);
        Ok(true)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.lock().await.entries.len())
    }
}
