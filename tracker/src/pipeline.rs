//! Wires the ingestion pipeline together:
//!
//! ```text
//! feed → ReceiveLoop → (decode) → ingestion queue → MergeWorker → store ← QueryService
//! ```
//!
//! [`spawn`] starts the receive loop and the merge worker as tasks and hands
//! back a [`PipelineHandle`] for reads, shutdown and joining.

use std::sync::Arc;

use adapters::feed::FeedConnector;
use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, info_span};

use crate::error::QueueError;
use crate::lifecycle::{Lifecycle, ShutdownReason};
use crate::metrics::{Counters, CountersSnapshot};
use crate::query::QueryService;
use crate::queue;
use crate::receiver::ReceiveLoop;
use crate::store::{LatestValueStore, StoreOptions};
use crate::worker::{MergeStats, MergeWorker};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Ingestion queue bound. A full queue stalls the receive loop.
    pub queue_capacity: usize,
    pub store: StoreOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            store: StoreOptions::default(),
        }
    }
}

pub struct PipelineHandle {
    lifecycle: Arc<Lifecycle>,
    query: QueryService,
    counters: Counters,
    receiver: JoinHandle<Result<(), QueueError>>,
    worker: JoinHandle<MergeStats>,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub reason: Option<ShutdownReason>,
    pub merged: MergeStats,
    pub counters: CountersSnapshot,
    pub tracked_symbols: usize,
}

/// Start ingesting from `connector`. Must be called inside a tokio runtime.
pub fn spawn<C>(connector: C, cfg: &PipelineConfig) -> PipelineHandle
where
    C: FeedConnector + 'static,
{
    let store = Arc::new(LatestValueStore::with_options(cfg.store.clone()));
    let lifecycle = Lifecycle::new();
    let counters = Counters::default();
    let (producer, consumer) = queue::bounded(cfg.queue_capacity);

    let worker = MergeWorker::new(Arc::clone(&store), Arc::clone(&lifecycle), counters.clone());
    let worker = tokio::spawn(worker.run(consumer).instrument(info_span!("merge_worker")));

    let receiver = ReceiveLoop::new(connector, producer, Arc::clone(&lifecycle), counters.clone());
    let receiver = tokio::spawn(receiver.run().instrument(info_span!("receive_loop")));

    info!(
        queue_capacity = cfg.queue_capacity,
        shards = store.shard_count(),
        tie_break = ?store.tie_break(),
        "ingestion pipeline started"
    );

    PipelineHandle {
        lifecycle,
        query: QueryService::new(store),
        counters,
        receiver,
        worker,
    }
}

impl PipelineHandle {
    pub fn query(&self) -> QueryService {
        self.query.clone()
    }

    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Explicit stop request. `false` if shutdown was already under way.
    pub fn shutdown(&self) -> bool {
        self.lifecycle.trigger_shutdown(ShutdownReason::Requested)
    }

    /// Wait for both tasks to finish.
    ///
    /// Does not trigger shutdown by itself; call [`PipelineHandle::shutdown`]
    /// first unless the feed is expected to end.
    pub async fn join(self) -> anyhow::Result<PipelineReport> {
        let received = self.receiver.await.context("receive loop task failed")?;
        let merged = self.worker.await.context("merge worker task failed")?;
        received.context("receive loop aborted")?;

        Ok(PipelineReport {
            reason: self.lifecycle.shutdown_reason(),
            merged,
            counters: self.counters.snapshot(),
            tracked_symbols: self.query.tracked_symbols(),
        })
    }
}
