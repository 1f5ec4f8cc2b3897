//! Receive loop: feed connector → decoder → ingestion queue.
//!
//! Runs until the feed goes away or shutdown is signalled, then closes the
//! ingestion queue exactly once so the merge worker can drain and stop.

use std::sync::Arc;
use std::time::Duration;

use adapters::feed::FeedConnector;
use tracing::{debug, error, info, warn};

use crate::decoder::decode;
use crate::error::QueueError;
use crate::lifecycle::{Lifecycle, ShutdownReason};
use crate::metrics::{Counters, bump};
use crate::queue::{EnqueueOutcome, QueueProducer};

/// Upper bound on the transport close handshake once the loop has stopped.
pub const CONNECTOR_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ReceiveLoop<C> {
    connector: C,
    producer: QueueProducer,
    lifecycle: Arc<Lifecycle>,
    counters: Counters,
}

impl<C: FeedConnector> ReceiveLoop<C> {
    pub fn new(
        connector: C,
        producer: QueueProducer,
        lifecycle: Arc<Lifecycle>,
        counters: Counters,
    ) -> Self {
        Self {
            connector,
            producer,
            lifecycle,
            counters,
        }
    }

    /// Drive the loop to completion.
    ///
    /// Feed loss and decode failures are absorbed (the former as a shutdown
    /// trigger). The only error is a queue fault, which also triggers
    /// shutdown.
    pub async fn run(self) -> Result<(), QueueError> {
        let Self {
            mut connector,
            producer,
            lifecycle,
            counters,
        } = self;

        let mut signal = lifecycle.signal();
        info!(queue_capacity = producer.capacity(), "receive loop started");

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = signal.triggered() => break Ok(()),
                next = connector.next_message() => next,
            };

            let raw = match next {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    lifecycle.trigger_shutdown(ShutdownReason::TransportDisconnected(
                        "feed closed".into(),
                    ));
                    break Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "feed read failed");
                    lifecycle.trigger_shutdown(ShutdownReason::TransportDisconnected(e.to_string()));
                    break Ok(());
                }
            };

            bump(&counters.messages_received);

            let record = match decode(&raw) {
                Ok(r) => r,
                Err(e) => {
                    bump(&counters.decode_failures);
                    warn!(error = %e, bytes = raw.len(), "dropping undecodable message");
                    continue;
                }
            };

            match producer.enqueue(record, &mut signal).await {
                Ok(EnqueueOutcome::Enqueued) => bump(&counters.records_enqueued),
                Ok(EnqueueOutcome::Abandoned) => {
                    bump(&counters.enqueues_abandoned);
                    debug!("enqueue abandoned on shutdown");
                    break Ok(());
                }
                Err(e) => {
                    error!(error = %e, "ingestion queue invariant violated");
                    lifecycle.trigger_shutdown(ShutdownReason::QueueFault);
                    break Err(e);
                }
            }
        };

        // The queue closes before the transport is released.
        let backlog = producer.backlog();
        producer.close();
        info!(backlog, "receive loop stopped; ingestion queue closed");

        if tokio::time::timeout(CONNECTOR_CLOSE_TIMEOUT, connector.close())
            .await
            .is_err()
        {
            warn!(
                timeout_ms = CONNECTOR_CLOSE_TIMEOUT.as_millis() as u64,
                "feed close did not complete; abandoning transport"
            );
        }

        result
    }
}
