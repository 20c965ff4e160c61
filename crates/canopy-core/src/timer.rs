//! [`TimerQueue`] – deadline-ordered, cancellable callbacks on a worker thread.
//!
//! A [`BehaviorTree`](crate::tree::BehaviorTree) owns one queue and installs
//! a handle to it on every node, so all timer-backed nodes of a tree (Timeout,
//! Delay, Sleep) share a single worker.  The worker starts on the first
//! [`add`][TimerQueue::add], sleeps until the earliest deadline, then runs the
//! callback with the queue unlocked so a callback may schedule or cancel
//! other timers.
//!
//! Cancelling a timer whose callback is already executing has no effect;
//! callers that need exclusion guard their own state (see the Timeout
//! decorator's generation counter).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use canopy_types::BtError;
use parking_lot::{Condvar, Mutex, MutexGuard};

/// Handle returned by [`TimerQueue::add`].
pub type TimerId = u64;

type Callback = Box<dyn FnOnce() + Send>;

// ────────────────────────────────────────────────────────────────────────────
// Internal state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Queue {
    deadlines: BinaryHeap<Reverse<(Instant, TimerId)>>,
    callbacks: HashMap<TimerId, Callback>,
    next_id: TimerId,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    cond: Condvar,
}

/// Owned by every handle; the last one to go stops the worker.
#[derive(Default)]
struct Inner {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock();
            queue.shutdown = true;
            queue.callbacks.clear();
            self.shared.cond.notify_all();
        }
        // A callback dropping the last handle must not join its own thread.
        if let Some(worker) = self.worker.get_mut().take()
            && worker.thread().id() != thread::current().id()
        {
            let _ = worker.join();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TimerQueue
// ────────────────────────────────────────────────────────────────────────────

/// A background thread running one-shot callbacks at their deadlines.
///
/// Clones share the same queue and worker.  Dropping the last clone discards
/// pending callbacks and joins the worker.
///
/// # Example
///
/// ```
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use canopy_core::timer::TimerQueue;
///
/// let timers = TimerQueue::new();
/// let (tx, rx) = mpsc::channel();
/// timers.add(Duration::from_millis(5), move || tx.send("fired").unwrap()).unwrap();
/// assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "fired");
/// ```
#[derive(Clone, Default)]
pub struct TimerQueue {
    inner: Arc<Inner>,
}

impl TimerQueue {
    /// An empty queue.  No thread is started until the first timer is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run once after `delay`.
    pub fn add(
        &self,
        delay: Duration,
        callback: impl FnOnce() + Send + 'static,
    ) -> Result<TimerId, BtError> {
        self.start_worker()?;
        let shared = &self.inner.shared;
        let mut queue = shared.queue.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.deadlines.push(Reverse((Instant::now() + delay, id)));
        queue.callbacks.insert(id, Box::new(callback));
        shared.cond.notify_one();
        Ok(id)
    }

    /// Cancel a pending timer.  Returns `false` if it already ran or was
    /// cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.inner.shared.queue.lock().callbacks.remove(&id).is_some()
    }

    pub fn cancel_all(&self) {
        let mut queue = self.inner.shared.queue.lock();
        queue.callbacks.clear();
        queue.deadlines.clear();
    }

    /// Number of timers that have not yet fired.
    pub fn pending(&self) -> usize {
        self.inner.shared.queue.lock().callbacks.len()
    }

    /// `true` while timer `id` has neither fired nor been cancelled.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.shared.queue.lock().callbacks.contains_key(&id)
    }

    /// `true` if both handles drive the same worker.
    pub fn same_as(&self, other: &TimerQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the worker thread has been started.
    pub fn is_started(&self) -> bool {
        self.inner.worker.lock().is_some()
    }

    fn start_worker(&self) -> Result<(), BtError> {
        let mut worker = self.inner.worker.lock();
        if worker.is_none() {
            let shared = Arc::clone(&self.inner.shared);
            let handle = thread::Builder::new()
                .name("canopy-timer".to_string())
                .spawn(move || run(&shared))?;
            *worker = Some(handle);
        }
        Ok(())
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending())
            .field("started", &self.is_started())
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// NodeTimer
// ────────────────────────────────────────────────────────────────────────────

/// The one pending timer of a node.
///
/// Timers go on the tree's shared queue when the node has one; a node used
/// outside a tree falls back to a private queue started on first use.
#[derive(Default)]
pub struct NodeTimer {
    queue: Option<TimerQueue>,
    pending: Option<TimerId>,
}

impl NodeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending timer with `callback` after `delay`, scheduled on
    /// `shared` when given.
    pub fn schedule(
        &mut self,
        shared: Option<&TimerQueue>,
        delay: Duration,
        callback: impl FnOnce() + Send + 'static,
    ) -> Result<(), BtError> {
        self.cancel();
        let queue = match shared {
            Some(shared) => self.queue.insert(shared.clone()),
            None => self.queue.get_or_insert_with(TimerQueue::new),
        };
        self.pending = Some(queue.add(delay, callback)?);
        Ok(())
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self) {
        if let (Some(queue), Some(id)) = (&self.queue, self.pending.take()) {
            queue.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        match (&self.queue, self.pending) {
            (Some(queue), Some(id)) => queue.is_pending(id),
            _ => false,
        }
    }
}

fn run(shared: &Shared) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            return;
        }
        let Some(&Reverse((deadline, id))) = queue.deadlines.peek() else {
            shared.cond.wait(&mut queue);
            continue;
        };
        if !queue.callbacks.contains_key(&id) {
            // Cancelled; drop the stale deadline.
            queue.deadlines.pop();
            continue;
        }
        if deadline > Instant::now() {
            shared.cond.wait_until(&mut queue, deadline);
            continue;
        }
        queue.deadlines.pop();
        if let Some(callback) = queue.callbacks.remove(&id) {
            MutexGuard::unlocked(&mut queue, callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn callbacks_fire_in_deadline_order() {
        let timers = TimerQueue::new();
        let (tx, rx) = mpsc::channel();
        let late = tx.clone();
        timers.add(Duration::from_millis(40), move || late.send(2).unwrap()).unwrap();
        timers.add(Duration::from_millis(10), move || tx.send(1).unwrap()).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!((first, second), (1, 2));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let timers = TimerQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let id = timers
            .add(Duration::from_millis(20), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn cancel_all_clears_everything() {
        let timers = TimerQueue::new();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            timers
                .add(Duration::from_millis(20), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(timers.pending(), 3);
        timers.cancel_all();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn node_timer_replaces_pending_timer() {
        let mut timer = NodeTimer::new();
        assert!(!timer.is_pending());

        let fired = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&fired);
        timer
            .schedule(None, Duration::from_millis(20), move || {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(timer.is_pending());

        let second = Arc::clone(&fired);
        timer
            .schedule(None, Duration::from_millis(20), move || {
                second.fetch_add(10, Ordering::SeqCst);
            })
            .unwrap();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        assert!(!timer.is_pending());
    }

    #[test]
    fn worker_starts_on_first_timer() {
        let timers = TimerQueue::new();
        assert!(!timers.is_started());
        timers.add(Duration::from_secs(60), || {}).unwrap();
        assert!(timers.is_started());
    }

    #[test]
    fn node_timers_share_one_queue_and_cancel_only_their_own() {
        let shared = TimerQueue::new();
        let mut first = NodeTimer::new();
        let mut second = NodeTimer::new();
        first.schedule(Some(&shared), Duration::from_secs(60), || {}).unwrap();
        second.schedule(Some(&shared), Duration::from_secs(60), || {}).unwrap();
        assert_eq!(shared.pending(), 2);

        first.cancel();
        assert!(!first.is_pending());
        assert!(second.is_pending());
        assert_eq!(shared.pending(), 1);
    }

    #[test]
    fn clones_keep_the_worker_alive() {
        let timers = TimerQueue::new();
        let handle = timers.clone();
        assert!(handle.same_as(&timers));
        drop(timers);

        let (tx, rx) = mpsc::channel();
        handle
            .add(Duration::from_millis(5), move || tx.send(()).unwrap())
            .unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn drop_joins_worker_with_pending_timers() {
        let timers = TimerQueue::new();
        timers.add(Duration::from_secs(60), || {}).unwrap();
        // Must return promptly instead of waiting a minute.
        let start = Instant::now();
        drop(timers);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
