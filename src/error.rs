//! Error types for mailroom.

use thiserror::Error;

use crate::model::{ItemId, State, WorkerId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: State, to: State },

    #[error("mail item {0} is already mailed")]
    AlreadyTerminal(ItemId),

    #[error("mail item {id} delivered in non-terminal state {state}")]
    NotDelivered { id: ItemId, state: State },

    #[error("completion sink overflow: capacity {capacity}")]
    SinkOverflow { capacity: usize },

    #[error("worker {0} panicked")]
    WorkerPanicked(WorkerId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
