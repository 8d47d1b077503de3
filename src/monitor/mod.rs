//! Progress monitoring.
//!
//! The pipeline reports every state transition and every change in worker
//! activity to a [`ProgressMonitor`]. What the monitor does with them
//! (counting, metrics, rendering) is its own business.
//!
//! # Consistency
//!
//! Reports arrive concurrently from every worker with no lock serializing
//! them. A transition is reported as one call, but implementations may apply
//! its decrement and increment separately, so a snapshot taken mid-flight can
//! be off by one per in-flight transition. Monitors are observability sinks
//! only; pipeline termination never reads them.

pub mod board;
pub mod display;
pub mod instrumented;

pub use board::{Snapshot, StateBoard, WorkerActivity};
pub use display::Display;
pub use instrumented::Instrumented;

use crate::model::{State, WorkerId};

/// Receives progress notifications from the pipeline.
pub trait ProgressMonitor: Send + Sync {
    /// A worker joined the pool.
    fn register_worker(&self, worker: WorkerId);

    /// A new item entered the pipeline in `state`.
    fn report_item_created(&self, state: State);

    /// An item moved from `old` to `new`.
    fn report_state_change(&self, old: State, new: State);

    /// `worker` started the unit of work named `label`.
    fn report_worker_busy(&self, worker: WorkerId, label: &str);

    /// `worker` finished its current unit of work.
    fn report_worker_idle(&self, worker: WorkerId);
}

/// A monitor that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {
    fn register_worker(&self, _worker: WorkerId) {}
    fn report_item_created(&self, _state: State) {}
    fn report_state_change(&self, _old: State, _new: State) {}
    fn report_worker_busy(&self, _worker: WorkerId, _label: &str) {}
    fn report_worker_idle(&self, _worker: WorkerId) {}
}

impl<M: ProgressMonitor + ?Sized> ProgressMonitor for std::sync::Arc<M> {
    fn register_worker(&self, worker: WorkerId) {
        (**self).register_worker(worker);
    }

    fn report_item_created(&self, state: State) {
        (**self).report_item_created(state);
    }

    fn report_state_change(&self, old: State, new: State) {
        (**self).report_state_change(old, new);
    }

    fn report_worker_busy(&self, worker: WorkerId, label: &str) {
        (**self).report_worker_busy(worker, label);
    }

    fn report_worker_idle(&self, worker: WorkerId) {
        (**self).report_worker_idle(worker);
    }
}
