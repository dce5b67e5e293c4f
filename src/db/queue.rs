//! Queue operations: conditional insert on the dedup key, list, remove.

use super::{Db, NotificationRow, TargetColumns};
use crate::error::Result;
use crate::model::{EventId, NewNotification, NotificationEvent};
use crate::queue::{EnqueueOutcome, EventQueue};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use uuid::Uuid;

#[async_trait::async_trait]
impl EventQueue for Db {
    async fn enqueue(&self, new: NewNotification) -> Result<EnqueueOutcome> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let dedup_key = new.target.dedup_key();
        let cols = TargetColumns::of(&new.target);

        // The unique index on dedup_key makes check-and-insert a single
        // statement; a concurrent insert for the same key sees the conflict.
        let inserted: Option<NotificationRow> = sqlx::query_as(
            "INSERT INTO notification_queue (id, dedup_key, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (dedup_key) DO NOTHING
             RETURNING id, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated",
        )
        .bind(id)
        .bind(&dedup_key)
        .bind(cols.refresh_all)
        .bind(cols.project_id)
        .bind(cols.group_id)
        .bind(cols.artifact_id)
        .bind(cols.version_id)
        .bind(new.event_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(EnqueueOutcome::Queued(Box::new(row.try_into_event()?)));
        }

        // Conflict: find the pending entry. It may have been drained in the
        // meantime, in which case the conflict still stands for this call.
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM notification_queue WHERE dedup_key = $1")
                .bind(&dedup_key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(EnqueueOutcome::Duplicate {
            existing: EventId(existing.map(|row| row.0).unwrap_or(Uuid::nil())),
        })
    }

    async fn list_all(&self) -> Result<Vec<NotificationEvent>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, refresh_all, project_id, group_id, artifact_id, version_id, event_id, last_updated
             FROM notification_queue ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::try_into_event).collect()
    }

    async fn remove(&self, id: EventId) -> Result<bool> {
        let rows_affected = sqlx::query("DELETE FROM notification_queue WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected > 0 {
            metrics::queue_removals().add(1, &[KeyValue::new("backend", "postgres")]);
        }
        Ok(rows_affected > 0)
    }

    async fn len(&self) -> Result<usize> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notification_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as usize)
    }
}
