//! Pipeline span helpers.
//!
//! Provides span creation for a run and its workers, and state-transition
//! recording for mail items flowing through them.

use tracing::Span;
use uuid::Uuid;

use crate::model::{ItemId, State, WorkerId};

/// Start a span for a whole pipeline run.
///
/// `run.elapsed_ms` is declared empty and filled in when the run ends.
pub fn start_run_span(run_id: &Uuid, items: usize, workers: usize) -> Span {
    tracing::info_span!(
        "pipeline.run",
        "run.id" = %run_id,
        "run.items" = items,
        "run.workers" = workers,
        "run.elapsed_ms" = tracing::field::Empty,
    )
}

/// Start a span for one worker, as a child of the run span.
pub fn start_worker_span(run: &Span, worker: WorkerId) -> Span {
    tracing::info_span!(parent: run, "pipeline.worker", "worker.id" = %worker)
}

/// Record a mail item state transition on the given span.
pub fn record_state_transition(span: &Span, id: ItemId, from: State, to: State) {
    span.in_scope(|| {
        tracing::debug!(item = %id, from = %from, to = %to, "state_transition");
    });
}

/// Record the run's wall-clock duration on its span.
pub fn record_elapsed(span: &Span, elapsed_ms: u64) {
    span.record("run.elapsed_ms", elapsed_ms);
}
