//! Tasks and the shared context they execute against.
//!
//! A task is plain data: "advance this item to that state". Executing it
//! does the work and schedules the item's next step back onto the action
//! queue, or hands the item to the completion sink once it is mailed. A
//! fixed pool of workers can thus drain an item through every state without
//! any thread being bound to a stage.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{Span, debug, error};

use crate::error::{Error, Result};
use crate::event::EventKind;
use crate::journal::Journal;
use crate::model::{MailItem, State, WorkerId};
use crate::monitor::ProgressMonitor;
use crate::pool::{Idle, pull_work};
use crate::queue::BoundedQueue;
use crate::sink::CompletionSink;
use crate::stage::Stages;
use crate::telemetry::work::record_state_transition;

/// One pending step for one item. Owns the item while queued.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub item: MailItem,
    /// The state this step moves the item into.
    pub to: State,
}

impl Task {
    /// The task for the item's next step, or `None` once it is mailed.
    pub fn for_item(item: MailItem) -> Option<Task> {
        let to = item.state().next()?;
        Some(Task { item, to })
    }

    /// Run this step, then every following step that cannot be queued.
    ///
    /// The continuation is queued with `try_push`. When the action queue is
    /// full the worker keeps the item and runs the next step itself, so a
    /// worker never waits on a queue that only workers can drain.
    pub fn execute(self, ctx: &Context, worker: WorkerId) -> Result<()> {
        let mut task = self;
        loop {
            match task.step(ctx, worker)? {
                Some(next) => match ctx.actions.try_push(next) {
                    Ok(()) => return Ok(()),
                    Err(next) => {
                        debug!(%worker, item = %next.item.id(), "action queue full, running inline");
                        task = next;
                    }
                },
                None => return Ok(()),
            }
        }
    }

    fn step(self, ctx: &Context, worker: WorkerId) -> Result<Option<Task>> {
        let Task { mut item, to } = self;
        let from = item.state();
        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition { from, to });
        }

        let more = ctx.stages.advance(&mut item, worker, ctx.monitor.as_ref())?;
        record_state_transition(&Span::current(), item.id(), from, to);
        ctx.record(EventKind::StateTransition {
            id: item.id(),
            from,
            to,
            worker,
        });

        if more {
            return Task::for_item(item)
                .map(Some)
                .ok_or_else(|| Error::Other("non-terminal item without a next state".into()));
        }

        let id = item.id();
        ctx.sink.deliver(item)?;
        ctx.record(EventKind::ItemDelivered { id, worker });
        Ok(None)
    }
}

/// Everything a task touches, shared by all workers of a run.
pub struct Context {
    pub(crate) actions: BoundedQueue<Task>,
    pub(crate) sink: CompletionSink,
    stages: Stages,
    monitor: std::sync::Arc<dyn ProgressMonitor>,
    journal: Option<Journal>,
    idle: Idle,
    aborted: AtomicBool,
    failure: Mutex<Option<Error>>,
}

impl Context {
    pub fn new(
        actions: BoundedQueue<Task>,
        sink: CompletionSink,
        stages: Stages,
        monitor: std::sync::Arc<dyn ProgressMonitor>,
    ) -> Self {
        Self {
            actions,
            sink,
            stages,
            monitor,
            journal: None,
            idle: Idle::default(),
            aborted: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_idle(mut self, idle: Idle) -> Self {
        self.idle = idle;
        self
    }

    pub fn actions(&self) -> &BoundedQueue<Task> {
        &self.actions
    }

    pub fn sink(&self) -> &CompletionSink {
        &self.sink
    }

    pub fn monitor(&self) -> &dyn ProgressMonitor {
        self.monitor.as_ref()
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub(crate) fn record(&self, kind: EventKind) {
        if let Some(journal) = &self.journal {
            journal.record(kind);
        }
    }

    /// Workers keep going until every item is delivered, or a task failed.
    pub fn keep_working(&self) -> bool {
        !self.sink.is_complete() && !self.is_aborted()
    }

    /// Execute one task, turning a failure into a run-wide abort.
    ///
    /// A panic inside the task is caught and recorded as
    /// [`Error::WorkerPanicked`]: the item it owned is gone, so the sink can
    /// no longer fill and the run has to stop.
    pub fn run_task(&self, task: Task, worker: WorkerId) {
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| task.execute(self, worker))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                error!(%worker, "task failed: {e}");
                e
            }
            Err(payload) => {
                error!(%worker, "task panicked: {}", panic_message(payload.as_ref()));
                Error::WorkerPanicked(worker)
            }
        };
        self.fail(failure);
    }

    /// Keep the first failure of the run and stop every worker.
    fn fail(&self, failure: Error) {
        self.failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_or_insert(failure);
        self.abort();
    }

    /// Stop every worker once the action queue is empty, whether or not the
    /// sink is full.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// The pull loop of one worker. Returns the number of tasks it handled.
    pub fn run_worker(&self, worker: WorkerId) -> u64 {
        self.record(EventKind::WorkerStarted { worker });
        let handled = pull_work(
            &self.actions,
            || self.keep_working(),
            self.idle,
            |task| self.run_task(task, worker),
        );
        self.record(EventKind::WorkerStopped { worker, handled });
        handled
    }

    /// The first task failure of the run, if any.
    pub fn take_failure(&self) -> Option<Error> {
        self.failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub(crate) fn into_parts(self) -> (CompletionSink, Option<Journal>, BoundedQueue<Task>) {
        (self.sink, self.journal, self.actions)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
