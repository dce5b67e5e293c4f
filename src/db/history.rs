//! History operations: append and inclusive range query.

use super::{Db, NotificationRow, TargetColumns};
use crate::error::Result;
use crate::history::EventHistory;
use crate::model::{HistoryEventId, NewHistoryRecord, NotificationEvent};
use crate::telemetry::metrics;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use uuid::Uuid;

#[async_trait::async_trait]
impl EventHistory for Db {
    async fn insert(&self, record: NewHistoryRecord) -> Result<NotificationEvent> {
        let id = Uuid::new_v4();
        let last_updated = record.last_updated.unwrap_or_else(Utc::now);
        let cols = TargetColumns::of(&record.target);
        let (event_id, mint) = match record.event_id {
            HistoryEventId::Keep(event_id) => (event_id, false),
            HistoryEventId::Mint => (None, true),
        };

        let row: NotificationRow = sqlx::query_as(
            "INSERT INTO notification_history (id, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6,
                     CASE WHEN $9 THEN nextval('notification_history_event_id_seq') ELSE $7 END,
                     $8)
             RETURNING id, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated",
        )
        .bind(id)
        .bind(cols.refresh_all)
        .bind(cols.project_id)
        .bind(cols.group_id)
        .bind(cols.artifact_id)
        .bind(cols.version_id)
        .bind(event_id)
        .bind(last_updated)
        .bind(mint)
        .fetch_one(&self.pool)
        .await?;

        metrics::history_inserts().add(1, &[KeyValue::new("backend", "postgres")]);
        row.try_into_event()
    }

    async fn query_after(
        &self,
        since: DateTime<Utc>,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated
             FROM notification_history
             WHERE last_updated >= $1
             AND ($2::text IS NULL OR project_id = $2)
             ORDER BY last_updated ASC, seq ASC",
        )
        .bind(since)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::try_into_event).collect()
    }
}
