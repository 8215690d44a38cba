use crate::config::QueueOrder;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Unbounded multi-producer, multi-consumer work queue.
///
/// All state lives behind one mutex, so every push and pop is observed
/// atomically. Consumers that want to block use [`WorkQueue::pop_wait`],
/// which parks on a condition variable instead of spinning.
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    order: QueueOrder,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Bumped by every `wake_all`, so waiters can tell it apart from a push
    /// whose item another consumer already took.
    wakeups: u64,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::with_order(QueueOrder::Fifo)
    }

    pub fn with_order(order: QueueOrder) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                wakeups: 0,
            }),
            available: Condvar::new(),
            order,
        }
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    pub fn push(&self, item: T) {
        self.state.lock().items.push_back(item);
        self.available.notify_one();
    }

    /// Non-blocking; `None` when nothing is pending.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        self.take(&mut state.items)
    }

    /// Waits up to `timeout` for an item. Returns `None` on timeout or when
    /// woken by [`WorkQueue::wake_all`] with nothing pending. Losing a pushed
    /// item to another consumer keeps the caller waiting until the deadline.
    pub fn pop_wait(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let wakeups = state.wakeups;
        loop {
            if let Some(item) = self.take(&mut state.items) {
                return Some(item);
            }
            // The caller should re-check its own exit condition.
            if state.wakeups != wakeups {
                return None;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return self.take(&mut state.items);
            }
        }
    }

    /// Racy by nature: the answer may be stale by the time the caller acts on it.
    pub fn has_pending(&self) -> bool {
        !self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_pending()
    }

    /// Wake every consumer blocked in `pop_wait`.
    pub fn wake_all(&self) {
        let mut state = self.state.lock();
        state.wakeups = state.wakeups.wrapping_add(1);
        self.available.notify_all();
    }

    fn take(&self, items: &mut VecDeque<T>) -> Option<T> {
        match self.order {
            QueueOrder::Fifo => items.pop_front(),
            QueueOrder::Lifo => items.pop_back(),
        }
    }
}
