//! Notification manager: the entry points the API layer calls.
//!
//! Admission runs validation before the queue sees anything, so a rejected
//! event never touches queue state. History reads parse the boundary
//! timestamp before the store is queried.

use crate::error::{Error, Result};
use crate::history::EventHistory;
use crate::model::{Coordinate, NewNotification, NotificationEvent};
use crate::queue::{EnqueueOutcome, EventQueue};
use crate::telemetry::metrics;
use crate::telemetry::notify::{record_admission, start_admission_span, start_history_span};
use crate::timestamp::TimestampFormat;
use crate::validator::CoordinateValidator;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, warn};

/// Façade over validator, queue and history.
#[derive(Clone)]
pub struct NotificationManager {
    queue: Arc<dyn EventQueue>,
    history: Arc<dyn EventHistory>,
    validator: CoordinateValidator,
    timestamp_format: TimestampFormat,
}

impl NotificationManager {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        history: Arc<dyn EventHistory>,
        validator: CoordinateValidator,
    ) -> Self {
        Self {
            queue,
            history,
            validator,
            timestamp_format: TimestampFormat::default(),
        }
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    /// Queue a notification for one project coordinate.
    ///
    /// # Errors
    ///
    /// `InvalidCoordinate` if the project does not resolve, `AlreadyQueued`
    /// if the coordinate already has a pending notification.
    pub async fn queue_event(
        &self,
        project_id: &str,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        event_id: Option<i64>,
    ) -> Result<NotificationEvent> {
        let coordinate = Coordinate::new(group_id, artifact_id, version_id);
        let mut new = NewNotification::for_coordinate(project_id, coordinate.clone());
        if let Some(event_id) = event_id {
            new = new.event_id(event_id);
        }
        let span = start_admission_span(new.target());

        async {
            if !self.validator.validate(project_id, &coordinate).await? {
                record_admission(&span, "invalid");
                metrics::queue_admissions().add(
                    1,
                    &[
                        KeyValue::new("target", "specific"),
                        KeyValue::new("result", "invalid"),
                    ],
                );
                warn!(project_id, %coordinate, "rejected notification for unknown coordinate");
                return Err(Error::InvalidCoordinate {
                    project_id: project_id.to_string(),
                    coordinate: coordinate.clone(),
                });
            }
            self.admit(new, &span).await
        }
        .instrument(span.clone())
        .await
    }

    /// Queue the refresh-all broadcast. No coordinate validation applies.
    pub async fn queue_refresh_all_event(&self) -> Result<NotificationEvent> {
        let new = NewNotification::refresh_all();
        let span = start_admission_span(new.target());
        self.admit(new, &span).instrument(span.clone()).await
    }

    async fn admit(&self, new: NewNotification, span: &tracing::Span) -> Result<NotificationEvent> {
        let target = new.target().clone();
        let started = Instant::now();
        let outcome = self.queue.enqueue(new).await?;
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "queue.enqueue")],
        );

        let result = if outcome.is_duplicate() { "duplicate" } else { "ok" };
        record_admission(span, result);
        metrics::queue_admissions().add(
            1,
            &[
                KeyValue::new("target", target.kind()),
                KeyValue::new("result", result),
            ],
        );

        match outcome {
            EnqueueOutcome::Queued(event) => {
                info!(id = %event.id, %target, "notification queued");
                Ok(*event)
            }
            EnqueueOutcome::Duplicate { existing } => {
                info!(%existing, %target, "notification already queued");
                Err(Error::AlreadyQueued(target.to_string()))
            }
        }
    }

    /// All history records at or after `since`, optionally for one project.
    ///
    /// # Errors
    ///
    /// `InvalidTimestamp` if `since` does not match the configured format;
    /// storage is not queried in that case.
    pub async fn get_all_events(
        &self,
        since: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>> {
        let span = start_history_span(since, project_id);
        let events = self
            .query_history(since, project_id)
            .instrument(span.clone())
            .await?;
        span.record("notify.count", events.len() as u64);
        Ok(events)
    }

    async fn query_history(
        &self,
        since: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<NotificationEvent>> {
        let since_at = match self.timestamp_format.parse(since) {
            Ok(at) => at,
            Err(e) => {
                metrics::history_queries().add(1, &[KeyValue::new("result", "invalid_timestamp")]);
                warn!(since, "rejected history query with malformed timestamp");
                return Err(e);
            }
        };

        let started = Instant::now();
        let events = self.history.query_after(since_at, project_id).await;
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "history.query")],
        );

        let result = if events.is_ok() { "ok" } else { "error" };
        metrics::history_queries().add(1, &[KeyValue::new("result", result)]);
        events
    }

    /// Snapshot of the pending queue.
    pub async fn get_all_events_in_queue(&self) -> Result<Vec<NotificationEvent>> {
        self.queue.list_all().await
    }
}
