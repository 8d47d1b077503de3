//! Pipeline orchestrator.
//!
//! Builds the queues, starts the worker pool, creates and seeds the mail
//! items, then turns the calling thread into one more worker until every
//! item has been delivered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::journal::Journal;
use crate::model::{ItemId, MailItem, State, WorkerId};
use crate::monitor::ProgressMonitor;
use crate::pool::{Idle, WorkerPool};
use crate::queue::{BoundedQueue, QueueStats};
use crate::sink::CompletionSink;
use crate::stage::Stages;
use crate::task::{Context, Task};
use crate::telemetry::metrics;
use crate::telemetry::work::{record_elapsed, start_run_span, start_worker_span};

/// Idle pause of the journal's service thread.
const JOURNAL_IDLE: Duration = Duration::from_millis(10);

/// Outcome of a completed run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub items: usize,
    pub workers: usize,
    /// Every delivered item, sorted by id.
    pub delivered: Vec<MailItem>,
    /// Tasks handled per worker, orchestrator first.
    pub handled: Vec<(WorkerId, u64)>,
    pub elapsed: Duration,
    /// Action queue statistics after the run.
    pub action_queue: QueueStats,
    /// Journal events, empty unless the journal was enabled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

impl RunReport {
    pub fn total_handled(&self) -> u64 {
        self.handled.iter().map(|(_, n)| n).sum()
    }
}

/// Runs mail items through the pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    monitor: Arc<dyn ProgressMonitor>,
    journal: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, monitor: Arc<dyn ProgressMonitor>) -> Self {
        Self {
            config,
            monitor,
            journal: false,
        }
    }

    /// Record every transition through an [`Journal`] and return the events
    /// in the report.
    pub fn with_journal(mut self, enabled: bool) -> Self {
        self.journal = enabled;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `items` mail items with `workers` threads, the calling thread
    /// included.
    pub fn run(&self, items: usize, workers: usize) -> Result<RunReport> {
        check_counts(items, workers)?;
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let span = start_run_span(&run_id, items, workers);
        let _enter = span.enter();
        let started = Instant::now();
        info!("starting with {items} items and {workers} threads");

        let actions = BoundedQueue::with_options(
            self.config.action_capacity,
            self.config.order,
            self.config.wait,
        )?;
        let mut ctx = Context::new(
            actions,
            CompletionSink::expecting(items)?,
            Stages::from_config(&self.config),
            Arc::clone(&self.monitor),
        );
        if self.journal {
            let journal = Journal::start(self.config.journal_capacity, Idle::Sleep(JOURNAL_IDLE))?;
            ctx = ctx.with_journal(journal);
        }
        let ctx = Arc::new(ctx);

        for idx in 0..workers {
            self.monitor.register_worker(WorkerId(idx));
        }

        let spawned = {
            let ctx = Arc::clone(&ctx);
            let run_span = span.clone();
            WorkerPool::spawn(workers - 1, move |worker| {
                let _worker = start_worker_span(&run_span, worker).entered();
                ctx.run_worker(worker)
            })
        };
        // Threads started before a failed spawn are detached and must not
        // wait for a sink that will never fill.
        let pool = spawned.inspect_err(|_| ctx.abort())?;

        let mut seeded = 0u64;
        for idx in 0..items {
            if ctx.is_aborted() {
                warn!(seeded = idx, "run aborted while seeding");
                break;
            }
            let item = MailItem::new(ItemId(idx as u64));
            self.monitor.report_item_created(State::Start);
            ctx.record(EventKind::ItemCreated { id: item.id() });
            if let Some(task) = Task::for_item(item) {
                seeded += seed(&ctx, task);
            }
        }

        let orchestrator = {
            let _worker = start_worker_span(&span, WorkerId::ORCHESTRATOR).entered();
            seeded + ctx.run_worker(WorkerId::ORCHESTRATOR)
        };

        let joined = pool.join();
        if let Some(failure) = ctx.take_failure() {
            return Err(failure);
        }
        let mut handled = vec![(WorkerId::ORCHESTRATOR, orchestrator)];
        handled.extend(joined?);

        let ctx = Arc::try_unwrap(ctx)
            .map_err(|_| Error::Other("pipeline context still shared after join".to_string()))?;
        let (sink, journal, actions) = ctx.into_parts();
        let events = match journal {
            Some(journal) => journal.finish()?,
            None => Vec::new(),
        };

        if !actions.is_empty() {
            warn!(left = actions.len(), "action queue not empty after run");
        }
        let delivered = sink.into_items();
        let elapsed = started.elapsed();
        record_elapsed(&span, elapsed.as_millis() as u64);
        metrics::run_duration_ms().record(elapsed.as_secs_f64() * 1000.0, &[]);
        info!(elapsed_ms = elapsed.as_millis() as u64, "work finished, threads joined");

        Ok(RunReport {
            run_id,
            items,
            workers,
            delivered,
            handled,
            elapsed,
            action_queue: actions.stats(),
            events,
        })
    }
}

/// Both counts must be positive: a run with no items or no workers is a
/// usage error, caught before any thread starts.
pub fn check_counts(items: usize, workers: usize) -> Result<()> {
    if items == 0 || workers == 0 {
        return Err(Error::InvalidArgs(format!(
            "need at least one item and one worker, got {items} items and {workers} workers"
        )));
    }
    Ok(())
}

/// Queue an item's first task. While the action queue is full the
/// orchestrator runs queued tasks itself, so seeding more items than the
/// queue holds cannot stall even with no dedicated workers. Returns the
/// number of tasks it ran.
fn seed(ctx: &Context, task: Task) -> u64 {
    let mut task = task;
    let mut ran = 0;
    loop {
        match ctx.actions().try_push(task) {
            Ok(()) => return ran,
            Err(rejected) => {
                task = rejected;
                match ctx.actions().try_pop() {
                    Some(queued) => {
                        ctx.run_task(queued, WorkerId::ORCHESTRATOR);
                        ran += 1;
                    }
                    None => std::thread::yield_now(),
                }
            }
        }
    }
}
