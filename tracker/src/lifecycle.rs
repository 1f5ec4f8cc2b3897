//! Lifecycle coordinator.
//!
//! One broadcast signal drives the write path through
//! `Running → ShuttingDown → Stopped`:
//!
//! - shutdown is triggered once, by a feed disconnect or an explicit stop
//! - the receive loop stops producing and closes the ingestion queue
//! - the merge worker drains what is buffered and marks the system `Stopped`
//!
//! Reads are unaffected; the query side keeps serving the last known state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Operator or embedding code asked the pipeline to stop.
    Requested,
    /// The feed connector reported loss of the feed.
    TransportDisconnected(String),
    /// The ingestion queue was closed under the producer.
    QueueFault,
    /// The receive loop went away without signalling shutdown.
    ReceiverGone,
}

pub struct Lifecycle {
    phase: watch::Sender<Phase>,
    reason: Mutex<Option<ShutdownReason>>,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        let (phase, _) = watch::channel(Phase::Running);
        Arc::new(Self {
            phase,
            reason: Mutex::new(None),
        })
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Move `Running → ShuttingDown`.
    ///
    /// Only the first call has an effect and returns `true`; its reason is
    /// the one reported by [`Lifecycle::shutdown_reason`].
    pub fn trigger_shutdown(&self, reason: ShutdownReason) -> bool {
        // Hold the reason lock across the transition so a reader never sees
        // ShuttingDown without a reason.
        let mut slot = self.reason.lock();

        let fired = self.phase.send_if_modified(|p| {
            if *p == Phase::Running {
                *p = Phase::ShuttingDown;
                true
            } else {
                false
            }
        });

        if fired {
            info!(reason = ?reason, "shutdown triggered");
            *slot = Some(reason);
        } else {
            debug!(reason = ?reason, "shutdown already in progress; trigger ignored");
        }

        fired
    }

    /// Final transition, performed by the merge worker once the queue is drained.
    pub(crate) fn mark_stopped(&self) {
        self.phase.send_if_modified(|p| {
            if *p == Phase::Stopped {
                false
            } else {
                *p = Phase::Stopped;
                true
            }
        });
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.reason.lock().clone()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.phase.subscribe(),
        }
    }

    /// Resolves once the write path has fully stopped.
    pub async fn stopped(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|p| *p == Phase::Stopped).await;
    }
}

/// Receiver side of the shutdown broadcast.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Phase>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() != Phase::Running
    }

    /// Resolves once shutdown has been triggered. Cancel-safe.
    pub async fn triggered(&mut self) {
        // An Err means the coordinator is gone, which counts as shutdown.
        let _ = self.rx.wait_for(|p| *p != Phase::Running).await;
    }
}
