//! Ingestion queue.
//!
//! Bounded FIFO between the receive loop (single producer) and the merge
//! worker (single consumer). A full queue stalls the producer instead of
//! dropping or reordering records.
//!
//! Closing is tied to ownership: [`QueueProducer::close`] consumes the
//! producer, so the queue is closed exactly once and nothing can be
//! written afterwards.

use corelib::UpdateRecord;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::QueueError;
use crate::lifecycle::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// Shutdown was observed while waiting for room; the record was discarded.
    Abandoned,
}

pub struct QueueProducer {
    tx: mpsc::Sender<UpdateRecord>,
    capacity: usize,
}

pub struct QueueConsumer {
    rx: mpsc::Receiver<UpdateRecord>,
}

/// Create a queue holding at most `capacity` records (minimum 1).
pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (QueueProducer { tx, capacity }, QueueConsumer { rx })
}

impl QueueProducer {
    /// Hand `record` to the consumer, waiting for room when the queue is full.
    ///
    /// Gives up with [`EnqueueOutcome::Abandoned`] if shutdown is signalled
    /// while waiting. [`QueueError::Closed`] means the consumer is gone.
    pub async fn enqueue(
        &self,
        record: UpdateRecord,
        shutdown: &mut ShutdownSignal,
    ) -> Result<EnqueueOutcome, QueueError> {
        tokio::select! {
            biased;
            sent = self.tx.send(record) => match sent {
                Ok(()) => Ok(EnqueueOutcome::Enqueued),
                Err(_) => Err(QueueError::Closed),
            },
            _ = shutdown.triggered() => Ok(EnqueueOutcome::Abandoned),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently buffered.
    pub fn backlog(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Close the queue. The consumer still receives everything already buffered.
    pub fn close(self) {
        debug!(backlog = self.backlog(), "closing ingestion queue");
    }
}

impl QueueConsumer {
    /// Next record in enqueue order; `None` once the queue is closed and empty.
    pub async fn dequeue(&mut self) -> Option<UpdateRecord> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Lifecycle, ShutdownReason};
    use std::time::Duration;

    fn rec(t: i64) -> UpdateRecord {
        UpdateRecord::new("BTCUSDT", t as f64, t)
    }

    #[tokio::test]
    async fn preserves_fifo_order_and_ends_after_close() {
        let lc = Lifecycle::new();
        let mut signal = lc.signal();
        let (producer, mut consumer) = bounded(8);

        for t in [3, 1, 2] {
            assert_eq!(
                producer.enqueue(rec(t), &mut signal).await,
                Ok(EnqueueOutcome::Enqueued)
            );
        }
        assert_eq!(producer.backlog(), 3);
        producer.close();

        let mut seen = Vec::new();
        while let Some(r) = consumer.dequeue().await {
            seen.push(r.event_time);
        }
        assert_eq!(seen, vec![3, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_producer_until_consumer_drains() {
        let lc = Lifecycle::new();
        let mut signal = lc.signal();
        let (producer, mut consumer) = bounded(2);

        producer.enqueue(rec(1), &mut signal).await.unwrap();
        producer.enqueue(rec(2), &mut signal).await.unwrap();

        let blocked = tokio::spawn(async move {
            let out = producer.enqueue(rec(3), &mut signal).await;
            (producer, out)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished(), "producer must wait while queue is full");

        assert_eq!(consumer.dequeue().await.unwrap().event_time, 1);

        let (producer, out) = blocked.await.unwrap();
        assert_eq!(out, Ok(EnqueueOutcome::Enqueued));
        producer.close();

        assert_eq!(consumer.dequeue().await.unwrap().event_time, 2);
        assert_eq!(consumer.dequeue().await.unwrap().event_time, 3);
        assert!(consumer.dequeue().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_enqueue_is_abandoned_on_shutdown() {
        let lc = Lifecycle::new();
        let mut signal = lc.signal();
        let (producer, mut consumer) = bounded(1);

        producer.enqueue(rec(1), &mut signal).await.unwrap();

        let blocked = tokio::spawn(async move {
            let out = producer.enqueue(rec(2), &mut signal).await;
            (producer, out)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        lc.trigger_shutdown(ShutdownReason::Requested);

        let (producer, out) = blocked.await.unwrap();
        assert_eq!(out, Ok(EnqueueOutcome::Abandoned));
        producer.close();

        // Already-buffered record survives the shutdown.
        assert_eq!(consumer.dequeue().await.unwrap().event_time, 1);
        assert!(consumer.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn enqueue_without_consumer_is_a_queue_fault() {
        let lc = Lifecycle::new();
        let mut signal = lc.signal();
        let (producer, consumer) = bounded(4);
        drop(consumer);

        assert_eq!(
            producer.enqueue(rec(1), &mut signal).await,
            Err(QueueError::Closed)
        );
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (producer, _consumer) = bounded(0);
        assert_eq!(producer.capacity(), 1);
    }
}
