//! Live counters for the display.
//!
//! One atomic counter per state and one slot per worker. Slots are
//! allocated up front for the pool size, so reporting never takes a lock
//! shared between workers: the only mutex is the per-slot label, and a slot
//! is written by its own worker.

use std::fmt::Write as _;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use super::ProgressMonitor;
use crate::model::{State, WorkerId};

#[derive(Debug, Default)]
struct WorkerSlot {
    registered: AtomicBool,
    label: Mutex<String>,
    actions: AtomicU64,
}

/// Per-state and per-worker counters fed by the pipeline.
#[derive(Debug)]
pub struct StateBoard {
    states: [AtomicI64; State::ALL.len()],
    workers: Vec<WorkerSlot>,
}

/// What one worker was last seen doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerActivity {
    pub worker: WorkerId,
    /// Empty when idle.
    pub label: String,
    pub actions: u64,
}

/// A point-in-time copy of the board. See the consistency note on
/// [`ProgressMonitor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub states: Vec<(State, i64)>,
    pub workers: Vec<WorkerActivity>,
}

impl Snapshot {
    pub fn count(&self, state: State) -> i64 {
        self.states
            .iter()
            .find(|(s, _)| *s == state)
            .map_or(0, |(_, n)| *n)
    }

    /// Items not yet mailed.
    pub fn in_flight(&self) -> i64 {
        self.states
            .iter()
            .filter(|(s, _)| !s.is_terminal())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn total_actions(&self) -> u64 {
        self.workers.iter().map(|w| w.actions).sum()
    }
}

impl StateBoard {
    /// A board with room for `workers` workers (ids `0..workers`).
    pub fn new(workers: usize) -> Self {
        Self {
            states: Default::default(),
            workers: (0..workers).map(|_| WorkerSlot::default()).collect(),
        }
    }

    fn slot(&self, worker: WorkerId) -> Option<&WorkerSlot> {
        self.workers.get(worker.0)
    }

    fn set_label(&self, worker: WorkerId, label: &str) -> Option<&WorkerSlot> {
        let slot = self.slot(worker)?;
        let mut current = slot
            .label
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        current.clear();
        current.push_str(label);
        Some(slot)
    }

    pub fn count(&self, state: State) -> i64 {
        self.states[state.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        let states = State::ALL
            .into_iter()
            .map(|state| (state, self.count(state)))
            .collect();
        let workers = self
            .workers
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.registered.load(Ordering::Relaxed))
            .map(|(idx, slot)| WorkerActivity {
                worker: WorkerId(idx),
                label: slot
                    .label
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clone(),
                actions: slot.actions.load(Ordering::Relaxed),
            })
            .collect();
        Snapshot { states, workers }
    }

    /// One line of text: the per-state counts followed by each worker's
    /// current action and action count.
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        for (state, count) in &snapshot.states {
            let _ = write!(out, "{state}={count} ");
        }
        out.push('|');
        for worker in &snapshot.workers {
            let label = if worker.label.is_empty() {
                "-"
            } else {
                worker.label.as_str()
            };
            let _ = write!(out, " {}:{}({})", worker.worker, label, worker.actions);
        }
        out
    }
}

impl ProgressMonitor for StateBoard {
    fn register_worker(&self, worker: WorkerId) {
        if let Some(slot) = self.set_label(worker, "") {
            slot.actions.store(0, Ordering::Relaxed);
            slot.registered.store(true, Ordering::Relaxed);
        }
    }

    fn report_item_created(&self, state: State) {
        self.states[state.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn report_state_change(&self, old: State, new: State) {
        self.states[old.index()].fetch_sub(1, Ordering::Relaxed);
        self.states[new.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn report_worker_busy(&self, worker: WorkerId, label: &str) {
        if let Some(slot) = self.set_label(worker, label) {
            slot.actions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn report_worker_idle(&self, worker: WorkerId) {
        self.set_label(worker, "");
    }
}
