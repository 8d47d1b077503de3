//! Bounded thread-safe queue.
//!
//! Every check-then-mutate sequence runs under one mutex, so occupancy can
//! never exceed the capacity or go negative no matter how many threads race
//! on it. Blocking waits use a condition variable by default; a spinning
//! strategy is kept as a fallback.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which end `try_pop` takes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Earliest pushed first.
    #[default]
    Fifo,
    /// Most recently pushed first (stack discipline).
    Lifo,
}

/// How the blocking `push`/`pop` wait for room or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wait {
    /// Park on a condition variable.
    #[default]
    Block,
    /// Retry the `try_` operation, yielding between attempts.
    Spin,
}

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub total_pushed: u64,
    pub total_popped: u64,
}

struct Slots<T> {
    items: VecDeque<T>,
    total_pushed: u64,
    total_popped: u64,
}

/// A fixed-capacity queue safe under arbitrary concurrent callers.
pub struct BoundedQueue<T> {
    capacity: usize,
    order: Order,
    wait: Wait,
    slots: Mutex<Slots<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("order", &self.order)
            .field("wait", &self.wait)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> BoundedQueue<T> {
    /// Create a FIFO queue with blocking waits.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_options(capacity, Order::default(), Wait::default())
    }

    pub fn with_options(capacity: usize, order: Order, wait: Wait) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            order,
            wait,
            slots: Mutex::new(Slots {
                items: VecDeque::with_capacity(capacity.min(1024)),
                total_pushed: 0,
                total_popped: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    // A panic while holding the lock cannot leave `Slots` half-updated: each
    // critical section is a single push or pop plus a counter bump.
    fn lock(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_locked(&self, slots: &mut Slots<T>, item: T) {
        slots.items.push_back(item);
        slots.total_pushed += 1;
        self.not_empty.notify_one();
    }

    fn take_locked(&self, slots: &mut Slots<T>) -> Option<T> {
        let item = match self.order {
            Order::Fifo => slots.items.pop_front(),
            Order::Lifo => slots.items.pop_back(),
        }?;
        slots.total_popped += 1;
        self.not_full.notify_one();
        Some(item)
    }

    /// Store `item` if there is room. Hands the item back when full.
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        let mut slots = self.lock();
        if slots.items.len() >= self.capacity {
            return Err(item);
        }
        self.insert_locked(&mut slots, item);
        Ok(())
    }

    /// Store `item`, waiting for room as long as it takes.
    pub fn push(&self, item: T) {
        match self.wait {
            Wait::Block => {
                let mut slots = self.lock();
                while slots.items.len() >= self.capacity {
                    slots = self
                        .not_full
                        .wait(slots)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                self.insert_locked(&mut slots, item);
            }
            Wait::Spin => {
                let mut item = item;
                while let Err(rejected) = self.try_push(item) {
                    item = rejected;
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Remove one element, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut slots = self.lock();
        self.take_locked(&mut slots)
    }

    /// Remove one element, waiting for one to arrive.
    pub fn pop(&self) -> T {
        match self.wait {
            Wait::Block => {
                let mut slots = self.lock();
                loop {
                    if let Some(item) = self.take_locked(&mut slots) {
                        return item;
                    }
                    slots = self
                        .not_empty
                        .wait(slots)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
            Wait::Spin => loop {
                if let Some(item) = self.try_pop() {
                    return item;
                }
                std::thread::yield_now();
            },
        }
    }

    /// Remove one element, giving up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        match self.wait {
            Wait::Block => {
                let mut slots = self.lock();
                loop {
                    if let Some(item) = self.take_locked(&mut slots) {
                        return Some(item);
                    }
                    let remaining = deadline.checked_duration_since(Instant::now())?;
                    let (guard, _) = self
                        .not_empty
                        .wait_timeout(slots, remaining)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    slots = guard;
                }
            }
            Wait::Spin => loop {
                if let Some(item) = self.try_pop() {
                    return Some(item);
                }
                if Instant::now() >= deadline {
                    return None;
                }
                std::thread::yield_now();
            },
        }
    }

    /// Current occupancy. May be stale by the time the caller acts on it.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether occupancy has reached capacity. A hint, like [`len`](Self::len).
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn stats(&self) -> QueueStats {
        let slots = self.lock();
        QueueStats {
            len: slots.items.len(),
            capacity: self.capacity,
            total_pushed: slots.total_pushed,
            total_popped: slots.total_popped,
        }
    }

    /// Take every remaining element, in pop order.
    pub fn drain(&self) -> Vec<T> {
        let mut slots = self.lock();
        let mut out = Vec::with_capacity(slots.items.len());
        while let Some(item) = self.take_locked(&mut slots) {
            out.push(item);
        }
        self.not_full.notify_all();
        out
    }
}
