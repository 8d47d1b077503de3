//! Core data model.
//!
//! A mail item is the unit of work flowing through the pipeline. It has a
//! stable identity and a forward-only lifecycle state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Newtype for mail item IDs. Assigned once by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Newtype for worker identities. Worker 0 is the orchestrating thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// The orchestrating thread, which also runs the pull loop.
    pub const ORCHESTRATOR: WorkerId = WorkerId(0);
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a mail item, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Created, nothing done yet.
    Start,
    Folded,
    Stuffed,
    Sealed,
    Addressed,
    Stamped,
    /// Sent. Terminal.
    Mailed,
}

impl State {
    /// Every state, in order.
    pub const ALL: [State; 7] = [
        State::Start,
        State::Folded,
        State::Stuffed,
        State::Sealed,
        State::Addressed,
        State::Stamped,
        State::Mailed,
    ];

    /// Position in the processing order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The state reached by the next unit of work, or `None` once mailed.
    pub fn next(self) -> Option<State> {
        use State::*;
        match self {
            Start => Some(Folded),
            Folded => Some(Stuffed),
            Stuffed => Some(Sealed),
            Sealed => Some(Addressed),
            Addressed => Some(Stamped),
            Stamped => Some(Mailed),
            Mailed => None,
        }
    }

    /// Can transition from self to `to`? Only a single step forward.
    pub fn can_transition_to(self, to: State) -> bool {
        self.next() == Some(to)
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Mailed)
    }

    /// Label of the work that moves an item out of this state.
    pub fn action(self) -> Option<&'static str> {
        use State::*;
        match self {
            Start => Some("folding"),
            Folded => Some("stuffing"),
            Stuffed => Some("sealing"),
            Sealed => Some("addressing"),
            Addressed => Some("stamping"),
            Stamped => Some("mailing"),
            Mailed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Start => "start",
            State::Folded => "folded",
            State::Stuffed => "stuffed",
            State::Sealed => "sealed",
            State::Addressed => "addressed",
            State::Stamped => "stamped",
            State::Mailed => "mailed",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        State::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| Error::Other(format!("unknown state: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Mail Item
// ---------------------------------------------------------------------------

/// A mail item tracked by the pipeline.
///
/// Ownership moves with the task that carries it, so only the worker
/// currently executing that task can advance it.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    id: ItemId,
    state: State,
}

impl MailItem {
    /// A fresh item in [`State::Start`].
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            state: State::Start,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Move the item one step forward to `to`.
    pub fn advance_to(&mut self, to: State) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
