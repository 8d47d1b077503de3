//! Metric instrument factories for mailroom.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created from the `"mailroom"` meter. Without an OTLP
//! endpoint the global provider is a no-op and recording costs nothing.

use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};

/// Returns the shared meter for mailroom instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("mailroom")
}

/// Counter: mail items created.
pub fn items_created() -> Counter<u64> {
    meter()
        .u64_counter("mailroom.item.created")
        .with_description("Number of mail items created")
        .build()
}

/// Counter: mail item state transitions.
/// Labels: `from`, `to`.
pub fn state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("mailroom.item.state_transitions")
        .with_description("Number of mail item state transitions")
        .build()
}

/// UpDownCounter: items currently in each state.
/// Labels: `state`.
pub fn items_in_state() -> UpDownCounter<i64> {
    meter()
        .i64_up_down_counter("mailroom.item.in_state")
        .with_description("Mail items currently in each state")
        .build()
}

/// Counter: units of work started by workers.
/// Labels: `worker`, `action`.
pub fn worker_actions() -> Counter<u64> {
    meter()
        .u64_counter("mailroom.worker.actions")
        .with_description("Units of work started by workers")
        .build()
}

/// Histogram: wall-clock duration of a whole pipeline run in milliseconds.
pub fn run_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("mailroom.run.duration_ms")
        .with_description("Pipeline run duration in milliseconds")
        .with_unit("ms")
        .build()
}
