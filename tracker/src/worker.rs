//! Merge worker: the only writer to the latest-value store.
//!
//! Drains the ingestion queue in order and applies every record. On
//! shutdown it keeps draining until the producer has closed the queue and
//! the buffer is empty, then moves the lifecycle to `Stopped`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::lifecycle::{Lifecycle, Phase, ShutdownReason};
use crate::metrics::{Counters, bump};
use crate::queue::QueueConsumer;
use crate::store::{ApplyOutcome, LatestValueStore};

/// What one worker run did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: u64,
    pub replaced: u64,
    pub stale: u64,
}

pub struct MergeWorker {
    store: Arc<LatestValueStore>,
    lifecycle: Arc<Lifecycle>,
    counters: Counters,
}

impl MergeWorker {
    pub fn new(store: Arc<LatestValueStore>, lifecycle: Arc<Lifecycle>, counters: Counters) -> Self {
        Self {
            store,
            lifecycle,
            counters,
        }
    }

    pub async fn run(self, mut queue: QueueConsumer) -> MergeStats {
        let mut signal = self.lifecycle.signal();
        let mut draining = signal.is_triggered();
        let mut stats = MergeStats::default();

        info!("merge worker started");

        loop {
            let next = if draining {
                queue.dequeue().await
            } else {
                tokio::select! {
                    biased;
                    next = queue.dequeue() => next,
                    _ = signal.triggered() => {
                        debug!("shutdown observed; draining ingestion queue");
                        draining = true;
                        continue;
                    }
                }
            };

            let Some(record) = next else {
                break;
            };

            match self.store.apply(record) {
                ApplyOutcome::Inserted => {
                    stats.inserted += 1;
                    bump(&self.counters.updates_inserted);
                }
                ApplyOutcome::Replaced => {
                    stats.replaced += 1;
                    bump(&self.counters.updates_replaced);
                }
                ApplyOutcome::Stale => {
                    stats.stale += 1;
                    bump(&self.counters.stale_dropped);
                }
            }
        }

        if self.lifecycle.phase() == Phase::Running {
            // Queue ended without a shutdown trigger: the receive loop is gone.
            warn!("ingestion queue closed while running; forcing shutdown");
            self.lifecycle.trigger_shutdown(ShutdownReason::ReceiverGone);
        }
        self.lifecycle.mark_stopped();

        info!(
            inserted = stats.inserted,
            replaced = stats.replaced,
            stale = stats.stale,
            symbols = self.store.len(),
            "merge worker stopped"
        );

        stats
    }
}
