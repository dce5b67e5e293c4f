//! Span helpers for notification admission and history reads.

use tracing::Span;

use crate::model::EventTarget;

/// Start a span covering one admission attempt.
///
/// `notify.result` is declared empty and filled by [`record_admission`].
pub fn start_admission_span(target: &EventTarget) -> Span {
    tracing::info_span!(
        "notify.admit",
        "notify.target" = target.kind(),
        "notify.project_id" = target.project_id().unwrap_or("*"),
        "notify.result" = tracing::field::Empty,
    )
}

/// Record the admission decision on the span and emit an event in it.
pub fn record_admission(span: &Span, result: &str) {
    span.record("notify.result", result);
    span.in_scope(|| {
        tracing::info!(result = result, "admission");
    });
}

/// Start a span for a history range query.
pub fn start_history_span(since: &str, project_id: Option<&str>) -> Span {
    tracing::info_span!(
        "notify.history",
        "notify.since" = since,
        "notify.project_id" = project_id.unwrap_or("*"),
        "notify.count" = tracing::field::Empty,
    )
}
