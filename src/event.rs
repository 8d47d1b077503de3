//! Structured events recorded while a pipeline runs.
//!
//! Events are the pipeline's narrative: which item moved where, and on
//! which worker. They travel through the [`Journal`](crate::journal::Journal)
//! rather than being printed from the workers directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ItemId, State, WorkerId};

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number, assigned at record time.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ItemCreated {
        id: ItemId,
    },
    StateTransition {
        id: ItemId,
        from: State,
        to: State,
        worker: WorkerId,
    },
    ItemDelivered {
        id: ItemId,
        worker: WorkerId,
    },
    WorkerStarted {
        worker: WorkerId,
    },
    WorkerStopped {
        worker: WorkerId,
        handled: u64,
    },
}

impl EventKind {
    /// The item this event is about, if any.
    pub fn item(&self) -> Option<ItemId> {
        match self {
            EventKind::ItemCreated { id }
            | EventKind::StateTransition { id, .. }
            | EventKind::ItemDelivered { id, .. } => Some(*id),
            EventKind::WorkerStarted { .. } | EventKind::WorkerStopped { .. } => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::ItemCreated { id } => write!(f, "mail item {id} created"),
            EventKind::StateTransition { id, to, worker, .. } => {
                write!(f, "[{worker}] mail item {id} was {to}")
            }
            EventKind::ItemDelivered { id, worker } => {
                write!(f, "[{worker}] mail item {id} was sent")
            }
            EventKind::WorkerStarted { worker } => write!(f, "[{worker}] start pulling work"),
            EventKind::WorkerStopped { worker, handled } => {
                write!(f, "[{worker}] stopped after {handled} tasks")
            }
        }
    }
}
