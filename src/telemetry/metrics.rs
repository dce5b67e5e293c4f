//! Metric instrument factories.
//!
//! Instruments come from the globally-registered `MeterProvider`; without
//! one they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

use super::INSTRUMENTATION_NAME;

fn meter() -> Meter {
    opentelemetry::global::meter(INSTRUMENTATION_NAME)
}

/// Counter: queue admission attempts.
/// Labels: `target` ("specific" | "refresh_all"), `result` ("ok" | "duplicate" | "invalid").
pub fn queue_admissions() -> Counter<u64> {
    meter()
        .u64_counter("notifications.queue.admissions")
        .with_description("Number of notification admission attempts")
        .build()
}

/// Counter: entries removed from the queue.
/// Labels: `backend`.
pub fn queue_removals() -> Counter<u64> {
    meter()
        .u64_counter("notifications.queue.removals")
        .with_description("Number of notifications removed from the queue")
        .build()
}

/// Counter: records appended to history.
/// Labels: `backend`.
pub fn history_inserts() -> Counter<u64> {
    meter()
        .u64_counter("notifications.history.inserts")
        .with_description("Number of history records written")
        .build()
}

/// Counter: history range queries.
/// Labels: `result` ("ok" | "invalid_timestamp" | "error").
pub fn history_queries() -> Counter<u64> {
    meter()
        .u64_counter("notifications.history.queries")
        .with_description("Number of history range queries")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("notifications.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
