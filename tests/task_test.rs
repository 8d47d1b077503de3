//! Tests for tasks, the completion sink and the pull loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mailroom::config::PipelineConfig;
use mailroom::monitor::{NullMonitor, ProgressMonitor};
use mailroom::pool::{Idle, WorkerPool, pull_work};
use mailroom::queue::BoundedQueue;
use mailroom::sink::CompletionSink;
use mailroom::stage::Stages;
use mailroom::task::{Context, Task};
use mailroom::{Error, ItemId, MailItem, State, WorkerId};

fn context(action_capacity: usize, expected: usize) -> Context {
    Context::new(
        BoundedQueue::new(action_capacity).unwrap(),
        CompletionSink::expecting(expected).unwrap(),
        Stages::from_config(&PipelineConfig::instant()),
        Arc::new(NullMonitor),
    )
}

/// Panics whenever a unit of work starts.
struct PanickingMonitor;

impl ProgressMonitor for PanickingMonitor {
    fn register_worker(&self, _worker: WorkerId) {}
    fn report_item_created(&self, _state: State) {}
    fn report_state_change(&self, _old: State, _new: State) {}
    fn report_worker_busy(&self, worker: WorkerId, _label: &str) {
        panic!("monitor failure on {worker}");
    }
    fn report_worker_idle(&self, _worker: WorkerId) {}
}

fn mailed(id: u64) -> MailItem {
    let mut item = MailItem::new(ItemId(id));
    let mut state = State::Start;
    while let Some(next) = state.next() {
        item.advance_to(next).unwrap();
        state = next;
    }
    item
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[test]
fn task_targets_the_next_state() {
    let task = Task::for_item(MailItem::new(ItemId(1))).unwrap();
    assert_eq!(task.to, State::Folded);
    assert_eq!(task.item.id(), ItemId(1));

    assert!(Task::for_item(mailed(2)).is_none());
}

#[test]
fn task_is_plain_serializable_data() {
    let task = Task::for_item(MailItem::new(ItemId(4))).unwrap();
    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["to"], "folded");
    assert_eq!(json["item"]["state"], "start");

    let back: Task = serde_json::from_value(json).unwrap();
    assert_eq!(back, task);
}

#[test]
fn executing_a_task_queues_the_next_step() {
    let ctx = context(4, 1);
    let task = Task::for_item(MailItem::new(ItemId(0))).unwrap();

    task.execute(&ctx, WorkerId(0)).unwrap();

    let next = ctx.actions().try_pop().expect("continuation queued");
    assert_eq!(next.item.state(), State::Folded);
    assert_eq!(next.to, State::Stuffed);
    assert_eq!(ctx.sink().delivered(), 0);
}

#[test]
fn last_step_delivers_into_the_sink() {
    let ctx = context(4, 1);
    let mut task = Task::for_item(MailItem::new(ItemId(0))).unwrap();
    loop {
        task.execute(&ctx, WorkerId(0)).unwrap();
        match ctx.actions().try_pop() {
            Some(next) => task = next,
            None => break,
        }
    }
    assert!(ctx.sink().is_complete());
    assert!(!ctx.keep_working());
}

#[test]
fn full_action_queue_runs_the_item_to_the_end_inline() {
    let ctx = context(1, 2);
    ctx.actions()
        .try_push(Task::for_item(MailItem::new(ItemId(1))).unwrap())
        .unwrap();

    let task = Task::for_item(MailItem::new(ItemId(0))).unwrap();
    task.execute(&ctx, WorkerId(0)).unwrap();

    assert_eq!(ctx.sink().delivered(), 1);
    assert_eq!(ctx.actions().len(), 1);
}

#[test]
fn mismatched_task_is_refused() {
    let ctx = context(4, 1);
    let task = Task {
        item: MailItem::new(ItemId(0)),
        to: State::Sealed,
    };
    let err = task.execute(&ctx, WorkerId(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
}

#[test]
fn failed_task_aborts_the_run() {
    let ctx = context(4, 3);
    ctx.run_task(
        Task {
            item: MailItem::new(ItemId(0)),
            to: State::Mailed,
        },
        WorkerId(0),
    );
    assert!(!ctx.keep_working());
    assert!(matches!(
        ctx.take_failure(),
        Some(Error::InvalidTransition { .. })
    ));
}

#[test]
fn panicking_task_is_recorded_as_a_worker_panic() {
    let ctx = Context::new(
        BoundedQueue::new(4).unwrap(),
        CompletionSink::expecting(1).unwrap(),
        Stages::from_config(&PipelineConfig::instant()),
        Arc::new(PanickingMonitor),
    );
    ctx.run_task(Task::for_item(MailItem::new(ItemId(0))).unwrap(), WorkerId(2));

    assert!(ctx.is_aborted());
    assert!(!ctx.keep_working());
    assert!(matches!(
        ctx.take_failure(),
        Some(Error::WorkerPanicked(WorkerId(2)))
    ));
}

#[test]
fn aborted_context_lets_workers_drain_and_exit() {
    let ctx = context(4, 3);
    ctx.actions()
        .try_push(Task::for_item(MailItem::new(ItemId(0))).unwrap())
        .unwrap();
    ctx.abort();

    // Without the abort this loop would wait forever on the unfilled sink.
    let handled = ctx.run_worker(WorkerId(1));

    // The queued item still runs to the end; only waiting stops.
    assert_eq!(handled, 6);
    assert!(ctx.actions().is_empty());
    assert_eq!(ctx.sink().delivered(), 1);
    assert!(!ctx.sink().is_complete());
    assert!(ctx.take_failure().is_none());
}

// ---------------------------------------------------------------------------
// Completion sink
// ---------------------------------------------------------------------------

#[test]
fn sink_refuses_unfinished_items() {
    let sink = CompletionSink::expecting(1).unwrap();
    let err = sink.deliver(MailItem::new(ItemId(5))).unwrap_err();
    assert!(matches!(
        err,
        Error::NotDelivered {
            id: ItemId(5),
            state: State::Start
        }
    ));
    assert_eq!(sink.delivered(), 0);
}

#[test]
fn sink_completes_at_expected_count_and_refuses_more() {
    let sink = CompletionSink::expecting(2).unwrap();
    sink.deliver(mailed(1)).unwrap();
    assert!(!sink.is_complete());
    sink.deliver(mailed(0)).unwrap();
    assert!(sink.is_complete());

    let err = sink.deliver(mailed(2)).unwrap_err();
    assert!(matches!(err, Error::SinkOverflow { capacity: 2 }));

    let ids: Vec<_> = sink.into_items().iter().map(MailItem::id).collect();
    assert_eq!(ids, vec![ItemId(0), ItemId(1)]);
}

#[test]
fn sink_must_expect_something() {
    assert!(matches!(
        CompletionSink::expecting(0),
        Err(Error::InvalidArgs(_))
    ));
}

// ---------------------------------------------------------------------------
// Pull loop
// ---------------------------------------------------------------------------

#[test]
fn pull_loop_exits_when_empty_and_predicate_false() {
    let queue = BoundedQueue::new(8).unwrap();
    for n in 0..5 {
        queue.push(n);
    }
    let mut seen = Vec::new();
    let handled = pull_work(&queue, || false, Idle::Spin, |n| seen.push(n));
    assert_eq!(handled, 5);
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn pull_loop_keeps_waiting_through_empty_moments() {
    for idle in [
        Idle::Spin,
        Idle::Sleep(Duration::from_millis(1)),
        Idle::Park(Duration::from_millis(1)),
    ] {
        let queue = Arc::new(BoundedQueue::new(2).unwrap());
        let handled = Arc::new(AtomicUsize::new(0));

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for n in 0..10 {
                    std::thread::sleep(Duration::from_millis(2));
                    queue.push(n);
                }
            })
        };

        let count = {
            let handled = Arc::clone(&handled);
            pull_work(
                &queue,
                || handled.load(Ordering::SeqCst) < 10,
                idle,
                |_| {
                    handled.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        producer.join().unwrap();
        assert_eq!(count, 10);
        assert!(queue.is_empty());
    }
}

#[test]
fn pool_joins_all_workers_and_reports_counts() {
    let pool = WorkerPool::spawn(3, |worker| worker.0 as u64 * 10).unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(
        pool.ids().collect::<Vec<_>>(),
        vec![WorkerId(1), WorkerId(2), WorkerId(3)]
    );

    let counts = pool.join().unwrap();
    assert_eq!(
        counts,
        vec![(WorkerId(1), 10), (WorkerId(2), 20), (WorkerId(3), 30)]
    );
}

#[test]
fn pool_reports_a_panicked_worker() {
    let pool = WorkerPool::spawn(2, |worker| {
        if worker == WorkerId(2) {
            panic!("boom");
        }
        1
    })
    .unwrap();
    assert!(matches!(pool.join(), Err(Error::WorkerPanicked(WorkerId(2)))));
}
