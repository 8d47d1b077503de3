//! Event journal drained by its own service thread.
//!
//! Workers record events into a small bounded queue; a service thread
//! sleeps between pulls (logging does not deserve a full core), writes each
//! event to the log and keeps it for the run report.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use chrono::Utc;
use tracing::info;

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::pool::{Idle, pull_work};
use crate::queue::BoundedQueue;

pub struct Journal {
    queue: Arc<BoundedQueue<Event>>,
    next_seq: AtomicU64,
    running: Arc<AtomicBool>,
    service: Mutex<Option<JoinHandle<Vec<Event>>>>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("queue", &self.queue)
            .field("next_seq", &self.next_seq.load(Ordering::Relaxed))
            .finish()
    }
}

impl Journal {
    /// Start the service thread with an event queue of `capacity`.
    pub fn start(capacity: usize, idle: Idle) -> Result<Self> {
        let queue = Arc::new(BoundedQueue::new(capacity)?);
        let running = Arc::new(AtomicBool::new(true));

        let service = {
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("mailroom-journal".to_string())
                .spawn(move || {
                    let mut events = Vec::new();
                    pull_work(
                        &queue,
                        || running.load(Ordering::Acquire),
                        idle,
                        |event: Event| {
                            info!(target: "mailroom::journal", seq = event.seq, "{}", event.kind);
                            events.push(event);
                        },
                    );
                    events.sort_by_key(|event| event.seq);
                    events
                })?
        };

        Ok(Self {
            queue,
            next_seq: AtomicU64::new(0),
            running,
            service: Mutex::new(Some(service)),
        })
    }

    /// Record an event, waiting for room in the queue if necessary.
    pub fn record(&self, kind: EventKind) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.queue.push(Event {
            seq,
            timestamp: Utc::now(),
            kind,
        });
    }

    /// Stop the service thread once the queue is drained and return every
    /// recorded event in sequence order.
    ///
    /// Must be called after all recording threads are done. A second call
    /// returns an empty list.
    pub fn finish(&self) -> Result<Vec<Event>> {
        self.running.store(false, Ordering::Release);
        let service = self
            .service
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match service {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Other("journal thread panicked".to_string())),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        let service = self
            .service
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = service {
            let _ = handle.join();
        }
    }
}
