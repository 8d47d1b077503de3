//! # mailroom
//!
//! Task-based mail item pipeline.
//!
//! A bounded, thread-safe action queue feeds a pool of worker threads. Each
//! task advances one mail item a single step (fold, stuff, seal, address,
//! stamp, mail) and then queues that item's next step itself. Mailed items
//! collect in a completion sink whose fullness tells every worker to stop.

pub mod config;
pub mod error;
pub mod event;
pub mod journal;
pub mod model;
pub mod monitor;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod sink;
pub mod stage;
pub mod task;
pub mod telemetry;

pub use error::{Error, Result};
pub use model::{ItemId, MailItem, State, WorkerId};
pub use pipeline::{Pipeline, RunReport};
pub use queue::BoundedQueue;
