//! Integration tests for the notification manager over in-memory stores.

use chrono::{DateTime, Duration, Utc};
use depot_notifications::history::{EventHistory, InMemoryHistory};
use depot_notifications::model::{
    Coordinate, EventTarget, NewHistoryRecord, NotificationEvent, ProjectRecord,
};
use depot_notifications::queue::{EventQueue, InMemoryQueue};
use depot_notifications::registry::{ProjectRegistry, StaticProjectRegistry};
use depot_notifications::timestamp::TimestampFormat;
use depot_notifications::validator::{CoordinateValidator, ValidationMode};
use depot_notifications::{Error, NotificationManager};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const VERSION: &str = "1.0.0";

struct Fixture {
    manager: NotificationManager,
    queue: Arc<InMemoryQueue>,
    history: Arc<InMemoryHistory>,
}

fn fixture_with(registry: StaticProjectRegistry) -> Fixture {
    let queue = Arc::new(InMemoryQueue::new());
    let history = Arc::new(InMemoryHistory::new());
    let validator = CoordinateValidator::new(Arc::new(registry), ValidationMode::Strict);
    let manager = NotificationManager::new(queue.clone(), history.clone(), validator);
    Fixture {
        manager,
        queue,
        history,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        StaticProjectRegistry::empty()
            .with_project(ProjectRecord::new("1", "test.group", "artifact")),
    )
}

fn specific(project: &str, group: &str) -> EventTarget {
    EventTarget::specific(project, Coordinate::new(group, "test", VERSION))
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_event_for_known_project_is_pending() {
    let f = fixture();

    let event = f
        .manager
        .queue_event("1", "test.group", "artifact", VERSION, Some(5))
        .await
        .unwrap();
    assert_eq!(event.event_id, Some(5));
    assert_eq!(event.target.project_id(), Some("1"));

    let pending = f.manager.get_all_events_in_queue().await.unwrap();
    assert_eq!(pending, vec![event]);
}

#[tokio::test]
async fn second_queue_event_for_same_coordinate_is_already_queued() {
    let f = fixture();

    f.manager
        .queue_event("1", "test.group", "artifact", VERSION, Some(5))
        .await
        .unwrap();
    let size_after_first = f.queue.len().await.unwrap();

    let err = f
        .manager
        .queue_event("1", "test.group", "artifact", VERSION, Some(6))
        .await
        .unwrap_err();
    assert!(err.is_already_queued(), "expected AlreadyQueued, got {err:?}");
    assert_eq!(f.queue.len().await.unwrap(), size_after_first);
}

#[tokio::test]
async fn unknown_project_is_rejected_and_queue_unchanged() {
    let f = fixture();
    f.manager
        .queue_event("1", "test.group", "artifact", VERSION, Some(5))
        .await
        .unwrap();
    assert_eq!(f.queue.len().await.unwrap(), 1);

    let err = f
        .manager
        .queue_event("2", "test.group", "artifact", VERSION, Some(5))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::InvalidCoordinate { ref project_id, .. } if project_id == "2"),
        "expected InvalidCoordinate, got {err:?}"
    );
    assert_eq!(f.queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn mismatched_artifact_is_rejected_in_strict_mode() {
    let f = fixture();
    let err = f
        .manager
        .queue_event("1", "test.group", "other-artifact", VERSION, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCoordinate { .. }));
    assert_eq!(f.queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn refresh_all_is_deduplicated() {
    let f = fixture();

    f.manager.queue_refresh_all_event().await.unwrap();
    let err = f.manager.queue_refresh_all_event().await.unwrap_err();
    assert!(err.is_already_queued());

    let pending = f.manager.get_all_events_in_queue().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].target.is_refresh_all());
}

#[tokio::test]
async fn refresh_all_needs_no_registered_project() {
    let f = fixture_with(StaticProjectRegistry::empty());
    let event = f.manager.queue_refresh_all_event().await.unwrap();
    assert!(event.target.is_refresh_all());
}

#[tokio::test]
async fn refresh_all_and_coordinate_events_coexist() {
    let f = fixture();
    f.manager.queue_refresh_all_event().await.unwrap();
    f.manager
        .queue_event("1", "test.group", "artifact", VERSION, None)
        .await
        .unwrap();
    assert_eq!(f.manager.get_all_events_in_queue().await.unwrap().len(), 2);
}

#[tokio::test]
async fn coordinate_can_be_queued_again_after_removal() {
    let f = fixture();
    let event = f
        .manager
        .queue_event("1", "test.group", "artifact", VERSION, None)
        .await
        .unwrap();

    assert!(f.queue.remove(event.id).await.unwrap());
    assert!(!f.queue.remove(event.id).await.unwrap());

    f.manager
        .queue_event("1", "test.group", "artifact", VERSION, None)
        .await
        .unwrap();
    assert_eq!(f.queue.len().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queue_event_admits_exactly_one() {
    let f = fixture();

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let manager = f.manager.clone();
            tokio::spawn(async move {
                manager
                    .queue_event("1", "test.group", "artifact", VERSION, Some(i))
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    let mut already_queued = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) if e.is_already_queued() => already_queued += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((ok, already_queued), (1, 1));
    assert_eq!(f.queue.len().await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[tokio::test]
async fn can_retrieve_events_by_date() {
    let f = fixture();
    let format = f.manager.timestamp_format().clone();

    let a_point_in_time = format.parse("2019-01-01 10:00:00").unwrap();
    for (project, group, at) in [
        ("testproject1", "test.com", a_point_in_time),
        ("testproject2", "test.comm", a_point_in_time + Duration::hours(1)),
        ("testproject3", "test.org", a_point_in_time + Duration::hours(2)),
        (
            "testproject4",
            "org.test",
            a_point_in_time + Duration::hours(2) + Duration::minutes(35),
        ),
    ] {
        f.history
            .insert(NewHistoryRecord::new(specific(project, group)).last_updated(at))
            .await
            .unwrap();
    }

    let all = f
        .manager
        .get_all_events(&format.format(a_point_in_time - Duration::days(100)), None)
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let after_lunch = f
        .manager
        .get_all_events("2019-01-01 12:00:00", None)
        .await
        .unwrap();
    assert_eq!(after_lunch.len(), 2);
    let projects: Vec<_> = after_lunch
        .iter()
        .filter_map(|e| e.target.project_id())
        .collect();
    assert_eq!(projects, vec!["testproject3", "testproject4"]);
}

#[tokio::test]
async fn history_filters_by_project() {
    let f = fixture();
    let at = f
        .manager
        .timestamp_format()
        .parse("2019-01-01 10:00:00")
        .unwrap();
    for project in ["a", "b", "a"] {
        f.history
            .insert(NewHistoryRecord::new(specific(project, "test.com")).last_updated(at))
            .await
            .unwrap();
    }

    let only_a = f
        .manager
        .get_all_events("2019-01-01 00:00:00", Some("a"))
        .await
        .unwrap();
    assert_eq!(only_a.len(), 2);
}

#[tokio::test]
async fn pending_refresh_all_does_not_appear_in_history() {
    let f = fixture();

    f.manager.queue_refresh_all_event().await.unwrap();

    let after_lunch = f
        .manager
        .get_all_events("2019-01-01 12:00:00", None)
        .await
        .unwrap();
    assert!(after_lunch.is_empty());
    assert_eq!(f.manager.get_all_events_in_queue().await.unwrap().len(), 1);
}

#[tokio::test]
async fn record_is_returned_when_since_equals_its_timestamp() {
    let f = fixture();
    let format = f.manager.timestamp_format().clone();
    let at = format.parse("2021-06-30 23:59:59").unwrap();

    let stored = f
        .history
        .insert(NewHistoryRecord::new(specific("p", "test.com")).last_updated(at))
        .await
        .unwrap();

    let found = f
        .manager
        .get_all_events(&format.format(stored.last_updated), None)
        .await
        .unwrap();
    assert_eq!(found, vec![stored]);
}

#[tokio::test]
async fn malformed_since_is_invalid_timestamp() {
    let f = fixture();
    for since in ["2019-01-01T12:00:00Z", "last tuesday", ""] {
        let err = f.manager.get_all_events(since, None).await.unwrap_err();
        assert!(
            matches!(err, Error::InvalidTimestamp { .. }),
            "expected InvalidTimestamp for {since:?}, got {err:?}"
        );
    }
}

#[tokio::test]
async fn custom_timestamp_format_is_used_for_since() {
    let f = fixture();
    let format = TimestampFormat::new("%d/%m/%Y %H:%M", chrono::FixedOffset::east_opt(0).unwrap())
        .unwrap();
    let manager = f.manager.clone().with_timestamp_format(format.clone());

    let at = format.parse("01/01/2019 10:00").unwrap();
    f.history
        .insert(NewHistoryRecord::new(specific("p", "test.com")).last_updated(at))
        .await
        .unwrap();

    assert_eq!(
        manager.get_all_events("01/01/2019 10:00", None).await.unwrap().len(),
        1
    );
    assert!(matches!(
        manager.get_all_events("2019-01-01 10:00:00", None).await,
        Err(Error::InvalidTimestamp { .. })
    ));
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

/// Registry whose backing store is down.
struct UnreachableRegistry;

#[async_trait::async_trait]
impl ProjectRegistry for UnreachableRegistry {
    async fn resolve_project(
        &self,
        _project_id: &str,
    ) -> depot_notifications::Result<Option<ProjectRecord>> {
        Err(Error::StorageUnavailable(sqlx::Error::PoolTimedOut))
    }
}

/// History that counts range queries and holds nothing.
#[derive(Default)]
struct CountingHistory {
    queries: AtomicUsize,
}

#[async_trait::async_trait]
impl EventHistory for CountingHistory {
    async fn insert(
        &self,
        _record: NewHistoryRecord,
    ) -> depot_notifications::Result<NotificationEvent> {
        Err(Error::Other("read-only".to_string()))
    }

    async fn query_after(
        &self,
        _since: DateTime<Utc>,
        _project_id: Option<&str>,
    ) -> depot_notifications::Result<Vec<NotificationEvent>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn registry_failure_is_storage_error_and_queue_unchanged() {
    let queue = Arc::new(InMemoryQueue::new());
    let validator =
        CoordinateValidator::new(Arc::new(UnreachableRegistry), ValidationMode::Strict);
    let manager =
        NotificationManager::new(queue.clone(), Arc::new(InMemoryHistory::new()), validator);

    let err = manager
        .queue_event("1", "test.group", "artifact", VERSION, Some(5))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::StorageUnavailable(sqlx::Error::PoolTimedOut)),
        "expected StorageUnavailable, got {err:?}"
    );
    assert_eq!(queue.len().await.unwrap(), 0);

    // Refresh-all never consults the registry.
    manager.queue_refresh_all_event().await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn malformed_since_never_reaches_history() {
    let history = Arc::new(CountingHistory::default());
    let validator = CoordinateValidator::new(
        Arc::new(StaticProjectRegistry::empty()),
        ValidationMode::Strict,
    );
    let manager =
        NotificationManager::new(Arc::new(InMemoryQueue::new()), history.clone(), validator);

    let err = manager
        .get_all_events("12:00 yesterday", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp { .. }));
    assert_eq!(history.queries.load(Ordering::SeqCst), 0);

    manager.get_all_events("2019-01-01 12:00:00", None).await.unwrap();
    assert_eq!(history.queries.load(Ordering::SeqCst), 1);
}
