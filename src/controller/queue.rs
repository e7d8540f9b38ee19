//! # Work Queue
//!
//! Deduplicating, rate-limited, delayed work queue keyed by `namespace/name`.
//!
//! Semantics follow the classic controller work queue:
//!
//! - A key is queued at most once. Adding a key that is already queued replaces
//!   its payload (last writer wins) without queueing it twice.
//! - A key handed out by [`WorkQueue::get`] is in flight until [`WorkQueue::done`].
//!   Adds for an in-flight key are remembered and the key is queued again,
//!   exactly once, when it is marked done. No two workers ever hold the same key.
//! - [`WorkQueue::add_after`] parks an item in a min-heap ordered by ready time.
//! - [`WorkQueue::add_rate_limited`] delays by the per-key exponential backoff.
//! - After [`WorkQueue::shut_down`], adds are dropped and `get` returns `None`.
//!
//! ## Usage
//!
//! ```rust
//! use repository_controller::controller::queue::{WorkItem, WorkQueue};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = WorkQueue::default();
//! queue.add(WorkItem::new("default/repo"));
//! queue.add(WorkItem::new("default/repo"));
//! assert_eq!(queue.len(), 1);
//!
//! let item = queue.get().await.unwrap();
//! assert_eq!(item.key, "default/repo");
//! queue.done(&item);
//! queue.shut_down();
//! assert!(queue.get().await.is_none());
//! # }
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::backoff::ExponentialBackoff;

/// Items stored in a [`WorkQueue`] are deduplicated by this key
pub trait QueueKey {
    fn queue_key(&self) -> &str;
}

/// A unit of reconciliation work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// `namespace/name` of the repository
    pub key: String,
    /// Failed passes so far; only the retry path increments it
    pub attempts: u32,
}

impl WorkItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attempts: 0,
        }
    }
}

impl QueueKey for WorkItem {
    fn queue_key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug)]
struct QueueState<T> {
    /// Keys ready to be handed out, in order
    queue: VecDeque<String>,
    /// Payload of every key that needs processing, queued or waiting for `done`
    dirty: HashMap<String, T>,
    /// Keys currently held by a worker
    processing: HashSet<String>,
    /// Delayed keys ordered by ready time; entries can be stale
    waiting: BinaryHeap<Reverse<(Instant, u64, String)>>,
    /// Authoritative ready time and payload of each delayed key
    waiting_payloads: HashMap<String, (Instant, T)>,
    /// Tie breaker keeping heap order stable for equal ready times
    seq: u64,
    limiter: ExponentialBackoff,
    shutting_down: bool,
}

impl<T: QueueKey> QueueState<T> {
    /// Returns true when a waiting getter should be woken
    fn insert(&mut self, item: T) -> bool {
        let key = item.queue_key().to_string();
        if self.dirty.insert(key.clone(), item).is_some() {
            // Already queued or pending re-queue; payload replaced
            return false;
        }
        if self.processing.contains(&key) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    /// Move every delayed item whose time has come into the queue
    fn promote_ready(&mut self, now: Instant) -> bool {
        let mut woke = false;
        while let Some(Reverse((ready_at, _, _))) = self.waiting.peek() {
            if *ready_at > now {
                break;
            }
            let Some(Reverse((ready_at, _, key))) = self.waiting.pop() else {
                break;
            };
            let current = self
                .waiting_payloads
                .get(&key)
                .is_some_and(|(at, _)| *at == ready_at);
            if !current {
                continue;
            }
            if let Some((_, item)) = self.waiting_payloads.remove(&key) {
                woke |= self.insert(item);
            }
        }
        woke
    }

    fn next_ready_at(&self) -> Option<Instant> {
        self.waiting.peek().map(|Reverse((at, _, _))| *at)
    }
}

/// Deduplicating, rate-limited work queue
#[derive(Debug)]
pub struct WorkQueue<T = WorkItem> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T: QueueKey> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new(ExponentialBackoff::default())
    }
}

impl<T: QueueKey> WorkQueue<T> {
    /// Create a queue whose rate-limited adds use `limiter`
    pub fn new(limiter: ExponentialBackoff) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashMap::new(),
                processing: HashSet::new(),
                waiting: BinaryHeap::new(),
                waiting_payloads: HashMap::new(),
                seq: 0,
                limiter,
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `item` for processing
    pub fn add(&self, item: T) {
        let wake = {
            let mut state = self.lock();
            if state.shutting_down {
                return;
            }
            state.insert(item)
        };
        if wake {
            self.notify.notify_one();
        }
    }

    /// Wait for the next item; `None` once the queue is shutting down
    ///
    /// The returned item's key is in flight until [`WorkQueue::done`] is called.
    pub async fn get(&self) -> Option<T> {
        loop {
            let mut notified = pin!(self.notify.notified());
            // Register before inspecting state so a wakeup in between is not lost
            notified.as_mut().enable();

            let next_ready_at = {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                let promoted = state.promote_ready(Instant::now());
                if let Some(key) = state.queue.pop_front() {
                    let more = promoted && !state.queue.is_empty();
                    let item = state.dirty.remove(&key);
                    if item.is_some() {
                        state.processing.insert(key);
                    }
                    drop(state);
                    if more {
                        // Hand the other promoted keys to idle workers
                        self.notify.notify_one();
                    }
                    match item {
                        Some(item) => return Some(item),
                        None => continue,
                    }
                }
                state.next_ready_at()
            };

            match next_ready_at {
                Some(at) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark `item` as no longer in flight
    ///
    /// If the key was added while in flight it is queued again.
    pub fn done(&self, item: &T) {
        let wake = {
            let mut state = self.lock();
            let key = item.queue_key();
            state.processing.remove(key);
            if state.dirty.contains_key(key) && !state.shutting_down {
                state.queue.push_back(key.to_string());
                true
            } else {
                false
            }
        };
        if wake {
            self.notify.notify_one();
        }
    }

    /// Queue `item` once `delay` has elapsed
    ///
    /// A key already waiting keeps the earlier of the two ready times; the
    /// payload is replaced.
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        {
            let mut state = self.lock();
            if state.shutting_down {
                return;
            }
            let key = item.queue_key().to_string();
            let mut ready_at = Instant::now() + delay;
            if let Some((existing, _)) = state.waiting_payloads.get(&key) {
                ready_at = ready_at.min(*existing);
            }
            state.seq += 1;
            let seq = state.seq;
            state.waiting.push(Reverse((ready_at, seq, key.clone())));
            state.waiting_payloads.insert(key, (ready_at, item));
        }
        // Sleeping getters recompute their deadline
        self.notify.notify_waiters();
    }

    /// Queue `item` after its key's backoff delay
    pub fn add_rate_limited(&self, item: T) {
        let delay = self.lock().limiter.when(item.queue_key());
        self.add_after(item, delay);
    }

    /// Clear the backoff history of `item`'s key
    pub fn forget(&self, item: &T) {
        self.lock().limiter.forget(item.queue_key());
    }

    /// Drop a delayed re-add of `key` that has not come due yet
    pub fn cancel_delayed(&self, key: &str) {
        // The heap entry goes stale and is skipped when it comes due
        self.lock().waiting_payloads.remove(key);
    }

    /// Rate-limited re-adds recorded for `key` since it was last forgotten
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.lock().limiter.num_requeues(key)
    }

    /// Number of keys ready to be handed out
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting work and wake every waiting `get`
    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}
