//! A monitor wrapper that also emits OTel metrics and tracing events.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, UpDownCounter};
use tracing::debug;

use super::ProgressMonitor;
use crate::model::{State, WorkerId};
use crate::telemetry::metrics;

/// Forwards every report to `inner` and records it as telemetry.
pub struct Instrumented<M> {
    inner: M,
    created: Counter<u64>,
    transitions: Counter<u64>,
    in_state: UpDownCounter<i64>,
    actions: Counter<u64>,
}

impl<M: ProgressMonitor> Instrumented<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            created: metrics::items_created(),
            transitions: metrics::state_transitions(),
            in_state: metrics::items_in_state(),
            actions: metrics::worker_actions(),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: ProgressMonitor> ProgressMonitor for Instrumented<M> {
    fn register_worker(&self, worker: WorkerId) {
        debug!(%worker, "worker registered");
        self.inner.register_worker(worker);
    }

    fn report_item_created(&self, state: State) {
        self.created.add(1, &[]);
        self.in_state
            .add(1, &[KeyValue::new("state", state.as_str())]);
        self.inner.report_item_created(state);
    }

    fn report_state_change(&self, old: State, new: State) {
        debug!(from = %old, to = %new, "state_transition");
        self.transitions.add(
            1,
            &[
                KeyValue::new("from", old.as_str()),
                KeyValue::new("to", new.as_str()),
            ],
        );
        self.in_state.add(-1, &[KeyValue::new("state", old.as_str())]);
        self.in_state.add(1, &[KeyValue::new("state", new.as_str())]);
        self.inner.report_state_change(old, new);
    }

    fn report_worker_busy(&self, worker: WorkerId, label: &str) {
        self.actions.add(
            1,
            &[
                KeyValue::new("worker", worker.to_string()),
                KeyValue::new("action", label.to_string()),
            ],
        );
        self.inner.report_worker_busy(worker, label);
    }

    fn report_worker_idle(&self, worker: WorkerId) {
        self.inner.report_worker_idle(worker);
    }
}
