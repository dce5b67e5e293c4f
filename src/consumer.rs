//! Draining side of the queue: turn a pending notification into history.

use crate::error::Result;
use crate::history::EventHistory;
use crate::model::{
    EventId, HistoryIdPolicy, NewHistoryRecord, NewNotification, NotificationEvent,
};
use crate::queue::EventQueue;
use tracing::{info, warn};

/// What happened to an acknowledged notification.
#[derive(Debug)]
pub enum AckOutcome {
    /// Removed from the queue and recorded; this is the history record.
    Recorded(Box<NotificationEvent>),
    /// No pending entry with that id, or another consumer removed it first.
    NotPending,
}

/// Remove a pending notification and append it to history.
///
/// The entry is removed first so two consumers never record it twice. If the
/// history write then fails, the event is offered to the queue again (under a
/// new id) and the write error is returned.
pub async fn acknowledge(
    queue: &dyn EventQueue,
    history: &dyn EventHistory,
    id: EventId,
    policy: HistoryIdPolicy,
) -> Result<AckOutcome> {
    let pending = queue.list_all().await?;
    let Some(event) = pending.into_iter().find(|e| e.id == id) else {
        return Ok(AckOutcome::NotPending);
    };
    if !queue.remove(id).await? {
        return Ok(AckOutcome::NotPending);
    }

    match history
        .insert(NewHistoryRecord::from_processed(&event, policy))
        .await
    {
        Ok(record) => {
            info!(%id, history_id = %record.id, target = %event.target, "notification recorded");
            Ok(AckOutcome::Recorded(Box::new(record)))
        }
        Err(e) => {
            warn!(%id, target = %event.target, error = %e, "history write failed, requeueing");
            if let Err(requeue) = queue.enqueue(NewNotification::requeue(&event)).await {
                warn!(%id, error = %requeue, "requeue failed, notification dropped");
            }
            Err(e)
        }
    }
}
