//! In-process priority scheduler shared by every plugin's worker pool.
//!
//! The scheduler owns no durable state and no knowledge of job content —
//! it is a min-heap of `(priority, enqueue sequence, id)` plus a wakeup
//! condition. Durable state lives in `auris-store`; on startup the binary
//! that owns this scheduler calls [`Scheduler::recover`] to re-seed the
//! heap from the store's active set.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use auris_core::{JobId, Priority};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    priority: Priority,
    seq: u64,
    id: JobId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A blocking priority queue of job ids.
///
/// Dequeue is strictly ordered by `(priority ascending, enqueue-seq
/// ascending)`: within one priority class, jobs come out FIFO; across
/// classes, strict priority. Starvation of `Low` under sustained
/// `Streaming` pressure is acceptable and by design — operators throttle
/// admission upstream instead of the scheduler compensating here.
pub struct Scheduler {
    heap: Mutex<BinaryHeap<Reverse<HeapEntry>>>,
    notify: Notify,
    next_seq: AtomicU64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Resolve the worker pool size: `0` means "use available parallelism".
    pub fn resolved_worker_count(configured: usize) -> usize {
        if configured == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            configured
        }
    }

    /// Resolve the parallelism-gate size `M`: `0` means "equal to `n`".
    pub fn resolved_parallelism_gate(configured: usize, n: usize) -> usize {
        if configured == 0 { n } else { configured.min(n.max(1)) }
    }

    /// Enqueue never blocks; the heap grows in memory without bound
    /// (operators cap pressure via upstream admission, e.g. cooldown).
    pub fn enqueue(&self, priority: Priority, id: JobId) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.heap.lock().unwrap().push(Reverse(HeapEntry { priority, seq, id }));
        self.notify.notify_one();
    }

    /// Suspend until an id is available, then pop the highest-priority one.
    pub async fn dequeue(&self) -> JobId {
        loop {
            if let Some(id) = self.try_dequeue() {
                return id;
            }
            self.notify.notified().await;
        }
    }

    fn try_dequeue(&self) -> Option<JobId> {
        self.heap.lock().unwrap().pop().map(|Reverse(e)| e.id)
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-enqueue a set of previously-active ids at recovery time, all at
    /// `Normal` priority (their original priority is not retained by the
    /// active-set — the store records job state, not scheduling intent).
    pub fn recover(&self, ids: impl IntoIterator<Item = JobId>) {
        for id in ids {
            self.enqueue(Priority::Normal, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn dequeues_in_priority_order_across_classes() {
        let s = Scheduler::new();
        let low = Uuid::new_v4();
        let streaming = Uuid::new_v4();
        let normal = Uuid::new_v4();
        s.enqueue(Priority::Low, low);
        s.enqueue(Priority::Normal, normal);
        s.enqueue(Priority::Streaming, streaming);

        assert_eq!(s.dequeue().await, streaming);
        assert_eq!(s.dequeue().await, normal);
        assert_eq!(s.dequeue().await, low);
    }

    #[tokio::test]
    async fn fifo_within_same_priority_class() {
        let s = Scheduler::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        s.enqueue(Priority::Normal, first);
        s.enqueue(Priority::Normal, second);

        assert_eq!(s.dequeue().await, first);
        assert_eq!(s.dequeue().await, second);
    }

    #[tokio::test]
    async fn dequeue_suspends_until_enqueue_wakes_it() {
        use std::sync::Arc;
        let s = Arc::new(Scheduler::new());
        let s2 = s.clone();
        let id = Uuid::new_v4();

        let handle = tokio::spawn(async move { s2.dequeue().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        s.enqueue(Priority::Normal, id);
        assert_eq!(handle.await.unwrap(), id);
    }

    #[test]
    fn zero_means_available_parallelism() {
        assert!(Scheduler::resolved_worker_count(0) >= 1);
        assert_eq!(Scheduler::resolved_worker_count(6), 6);
    }

    #[test]
    fn parallelism_gate_defaults_to_worker_count() {
        assert_eq!(Scheduler::resolved_parallelism_gate(0, 4), 4);
        assert_eq!(Scheduler::resolved_parallelism_gate(2, 4), 2);
        assert_eq!(Scheduler::resolved_parallelism_gate(10, 4), 4);
    }
}
