//! Ephemeral in-memory implementation of [EventHistory].

use super::EventHistory;
use crate::error::Result;
use crate::model::{EventId, HistoryEventId, NewHistoryRecord, NotificationEvent};
use crate::telemetry::metrics;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Kept sorted by `last_updated`; equal timestamps keep insertion order.
    records: Vec<NotificationEvent>,
    /// Last minted correlation id.
    minted: i64,
}

#[derive(Default)]
pub struct InMemoryHistory {
    inner: RwLock<Inner>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl EventHistory for InMemoryHistory {
    async fn insert(&self, record: NewHistoryRecord) -> Result<NotificationEvent> {
        let mut inner = self.inner.write().await;

        let event_id = match record.event_id {
            HistoryEventId::Keep(id) => id,
            HistoryEventId::Mint => {
                inner.minted += 1;
                Some(inner.minted)
            }
        };
        let event = NotificationEvent {
            id: EventId::new(),
            target: record.target,
            event_id,
            last_updated: record.last_updated.unwrap_or_else(Utc::now),
        };

        let pos = inner
            .records
            .partition_point(|r| r.last_updated <= event.last_updated);
        inner.records.insert(pos, event.clone());

        metrics::history_inserts().add(1, &[KeyValue::new("backend", "memory")]);
        Ok(event)
    }

    async fn query_after(
        &self,
        since: DateTime<Utc>,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>> {
        let inner = self.inner.read().await;
        let start = inner.records.partition_point(|r| r.last_updated < since);
        Ok(inner.records[start..]
            .iter()
            .filter(|r| project_id.is_none_or(|p| r.target.project_id() == Some(p)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, EventTarget};
    use chrono::{Duration, TimeZone};

    fn target(project: &str) -> EventTarget {
        EventTarget::specific(project, Coordinate::new("test.com", "test", "1.0.0"))
    }

    #[tokio::test]
    async fn query_is_inclusive_and_ordered() {
        let history = InMemoryHistory::new();
        let t0 = Utc.with_ymd_and_hms(2019, 1, 1, 10, 0, 0).unwrap();

        // Inserted out of order on purpose.
        for (project, at) in [
            ("p3", t0 + Duration::hours(2)),
            ("p1", t0),
            ("p4", t0 + Duration::minutes(155)),
            ("p2", t0 + Duration::hours(1)),
        ] {
            history
                .insert(NewHistoryRecord::new(target(project)).last_updated(at))
                .await
                .unwrap();
        }

        let all = history.query_after(t0, None).await.unwrap();
        let projects: Vec<_> = all.iter().filter_map(|e| e.target.project_id()).collect();
        assert_eq!(projects, vec!["p1", "p2", "p3", "p4"]);

        let after = history
            .query_after(t0 + Duration::hours(2), None)
            .await
            .unwrap();
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn query_filters_by_project() {
        let history = InMemoryHistory::new();
        history.insert(NewHistoryRecord::new(target("a"))).await.unwrap();
        history.insert(NewHistoryRecord::new(target("b"))).await.unwrap();
        history
            .insert(NewHistoryRecord::new(EventTarget::RefreshAll))
            .await
            .unwrap();

        let since = Utc::now() - Duration::minutes(1);
        assert_eq!(history.query_after(since, Some("a")).await.unwrap().len(), 1);
        assert_eq!(history.query_after(since, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn minted_ids_are_sequential() {
        let history = InMemoryHistory::new();
        let mut minted = Vec::new();
        for _ in 0..3 {
            let mut record = NewHistoryRecord::new(target("a"));
            record.event_id = HistoryEventId::Mint;
            minted.push(history.insert(record).await.unwrap().event_id);
        }
        assert_eq!(minted, vec![Some(1), Some(2), Some(3)]);
    }
}
