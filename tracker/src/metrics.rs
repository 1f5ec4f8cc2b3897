use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    // receive loop
    pub messages_received: Arc<AtomicU64>,
    pub decode_failures: Arc<AtomicU64>,
    pub records_enqueued: Arc<AtomicU64>,
    pub enqueues_abandoned: Arc<AtomicU64>,

    // merge worker
    pub updates_inserted: Arc<AtomicU64>,
    pub updates_replaced: Arc<AtomicU64>,
    pub stale_dropped: Arc<AtomicU64>,
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub messages_received: u64,
    pub decode_failures: u64,
    pub records_enqueued: u64,
    pub enqueues_abandoned: u64,
    pub updates_inserted: u64,
    pub updates_replaced: u64,
    pub stale_dropped: u64,
}

impl CountersSnapshot {
    /// Records the merge worker has taken off the queue.
    pub fn merged(&self) -> u64 {
        self.updates_inserted + self.updates_replaced + self.stale_dropped
    }
}

impl Counters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            messages_received: read(&self.messages_received),
            decode_failures: read(&self.decode_failures),
            records_enqueued: read(&self.records_enqueued),
            enqueues_abandoned: read(&self.enqueues_abandoned),
            updates_inserted: read(&self.updates_inserted),
            updates_replaced: read(&self.updates_replaced),
            stale_dropped: read(&self.stale_dropped),
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_counters() {
        let a = Counters::default();
        let b = a.clone();

        bump(&a.stale_dropped);
        bump(&b.stale_dropped);
        bump(&b.updates_inserted);

        let snap = a.snapshot();
        assert_eq!(snap.stale_dropped, 2);
        assert_eq!(snap.updates_inserted, 1);
        assert_eq!(snap.merged(), 3);
    }
}
