//! Worker threads and the pull loop they run.
//!
//! A worker keeps popping from a queue until the queue is empty *and* its
//! predicate says there is nothing left to wait for. An empty queue alone
//! is not enough: another worker may be mid-task and about to push more.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::WorkerId;
use crate::queue::BoundedQueue;

/// What a worker does between a failed pop and its next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idle {
    /// Yield the thread and retry immediately.
    Spin,
    /// Sleep for the given time. For service threads that need no full core.
    Sleep(Duration),
    /// Wait on the queue for up to the given time.
    Park(Duration),
}

impl Default for Idle {
    fn default() -> Self {
        Idle::Park(Duration::from_millis(5))
    }
}

/// Pull elements off `queue` and hand them to `handle` until the queue is
/// empty and `keep_waiting` returns false. Returns the number handled.
///
/// The predicate is re-checked after every failed pop, never used as a
/// one-shot exit.
pub fn pull_work<T, P, H>(queue: &BoundedQueue<T>, keep_waiting: P, idle: Idle, mut handle: H) -> u64
where
    P: Fn() -> bool,
    H: FnMut(T),
{
    let mut handled = 0u64;
    loop {
        if let Some(item) = queue.try_pop() {
            handle(item);
            handled += 1;
            continue;
        }
        if !keep_waiting() {
            return handled;
        }
        match idle {
            Idle::Spin => std::thread::yield_now(),
            Idle::Sleep(pause) => std::thread::sleep(pause),
            Idle::Park(timeout) => {
                if let Some(item) = queue.pop_timeout(timeout) {
                    handle(item);
                    handled += 1;
                }
            }
        }
    }
}

/// The dedicated worker threads of a run. The orchestrating thread is not
/// part of the pool; it runs its own loop alongside.
pub struct WorkerPool {
    workers: Vec<(WorkerId, JoinHandle<u64>)>,
}

impl WorkerPool {
    /// Start `threads` workers with ids `1..=threads`, each running `body`.
    pub fn spawn<F>(threads: usize, body: F) -> Result<Self>
    where
        F: Fn(WorkerId) -> u64 + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let mut workers = Vec::with_capacity(threads);
        for idx in 1..=threads {
            let id = WorkerId(idx);
            let body = Arc::clone(&body);
            let handle = std::thread::Builder::new()
                .name(format!("mailroom-worker-{idx}"))
                .spawn(move || body(id))?;
            debug!(worker = %id, "worker thread created");
            workers.push((id, handle));
        }
        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers.iter().map(|(id, _)| *id)
    }

    /// Wait for every worker. Returns how many tasks each one handled.
    ///
    /// All threads are joined even if one of them panicked; the first panic
    /// is then reported.
    pub fn join(self) -> Result<Vec<(WorkerId, u64)>> {
        let mut handled = Vec::with_capacity(self.workers.len());
        let mut panicked = None;
        for (id, handle) in self.workers {
            match handle.join() {
                Ok(count) => handled.push((id, count)),
                Err(_) => {
                    panicked.get_or_insert(id);
                }
            }
        }
        match panicked {
            Some(id) => Err(Error::WorkerPanicked(id)),
            None => Ok(handled),
        }
    }
}
