//! Synthetic ticker feed.
//!
//! A WebSocket server that pushes one JSON [`TickerData`] per interval to
//! every connected client, standing in for a live exchange feed during
//! development and load tests.
//!
//! [`TickerData`]: corelib::TickerData

pub mod generator;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use corelib::time::now_ms;
use futures::SinkExt;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{Instrument, debug, info, info_span, warn};

pub use generator::{DEFAULT_SYMBOLS, GeneratorConfig, TickerGenerator};

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("symbol universe is empty")]
    NoSymbols,

    #[error("stale ratio {0} is outside [0, 1]")]
    InvalidStaleRatio(f64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Delay between two tickers on one connection.
    pub interval: Duration,
    pub generator: GeneratorConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1),
            generator: GeneratorConfig::default(),
        }
    }
}

/// Accept feed clients on `listener` until `shutdown` resolves.
///
/// On shutdown every open connection receives a Close frame.
pub async fn serve<F>(
    listener: TcpListener,
    cfg: SimulatorConfig,
    shutdown: F,
) -> Result<(), SimulatorError>
where
    F: Future<Output = ()> + Send,
{
    // Fail fast on a bad generator config rather than per connection.
    TickerGenerator::new(cfg.generator.clone())?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let addr = listener.local_addr()?;
    info!(addr = %addr, every_ms = cfg.interval.as_millis() as u64, "feed simulator listening");

    tokio::pin!(shutdown);
    let mut conn_id: u64 = 0;
    let mut accept_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(a) => {
                        accept_failures = 0;
                        a
                    }
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let backoff = accept_backoff(accept_failures);
                        warn!(
                            error = %e,
                            failures = accept_failures,
                            backoff_ms = backoff.as_millis() as u64,
                            "accept failed"
                        );
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                        continue;
                    }
                };

                conn_id += 1;
                let mut gen_cfg = cfg.generator.clone();
                gen_cfg.seed = gen_cfg.seed.map(|s| s.wrapping_add(conn_id));
                let generator = TickerGenerator::new(gen_cfg)?;

                tokio::spawn(
                    stream_tickers(stream, peer, generator, cfg.interval, stop_rx.clone())
                        .instrument(info_span!("sim_conn", conn_id, peer = %peer)),
                );
            }
        }
    }

    let _ = stop_tx.send(true);
    info!(addr = %addr, connections = conn_id, "feed simulator stopped");
    Ok(())
}

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after the `failures`-th consecutive accept error: doubles from
/// 5ms, capped at 1s.
fn accept_backoff(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << exp)
        .min(ACCEPT_BACKOFF_MAX)
}

async fn stream_tickers(
    stream: TcpStream,
    peer: SocketAddr,
    mut generator: TickerGenerator,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(peer = %peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    info!(peer = %peer, "feed client connected");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            _ = stop.changed() => {
                if let Err(e) = ws.send(Message::Close(None)).await {
                    debug!(peer = %peer, error = %e, "close frame not delivered");
                }
                break;
            }
            _ = ticker.tick() => {
                let payload = match serde_json::to_string(&generator.next_ticker(now_ms())) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "failed to encode ticker");
                        continue;
                    }
                };

                if let Err(e) = ws.send(Message::Text(payload.into())).await {
                    info!(peer = %peer, sent, error = %e, "feed client went away");
                    break;
                }
                sent += 1;
            }
        }
    }

    debug!(peer = %peer, sent, "feed connection closed");
}
