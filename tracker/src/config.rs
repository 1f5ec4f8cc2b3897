use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use adapters::feed::ReconnectPolicy;
use tracing::warn;

use crate::pipeline::{DEFAULT_QUEUE_CAPACITY, PipelineConfig};
use crate::store::{StoreOptions, TieBreak};

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// WebSocket URL of the market-data feed.
    pub feed_url: String,

    /// Listen address of the HTTP query service.
    pub http_addr: SocketAddr,

    // =========================
    // Ingestion
    // =========================
    /// Queue bound, store sharding and tie-break policy.
    ///
    /// The queue capacity is the backpressure knob: once it fills up the
    /// receive loop stops reading from the feed until the merge worker
    /// catches up.
    pub pipeline: PipelineConfig,

    // =========================
    // Feed connection
    // =========================
    /// What the connector does when the feed drops.
    ///
    /// With `max_attempts = 0` (default) a disconnect stops ingestion and
    /// the query service keeps serving the last known prices.
    pub reconnect: ReconnectPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to the
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let feed_url = lookup("FEED_URL").unwrap_or_else(|| "ws://localhost:8081/ws".to_string());

        let http_addr = parse_or(&lookup, "HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)));

        let queue_capacity: usize = parse_or(&lookup, "QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY);
        let shards: usize = parse_or(&lookup, "STORE_SHARDS", 1);
        let tie_break: TieBreak = parse_or(&lookup, "TIE_BREAK", TieBreak::KeepResident);

        let reconnect_attempts: u32 = parse_or(&lookup, "FEED_RECONNECT_ATTEMPTS", 0);
        let reconnect_delay_ms: u64 = parse_or(&lookup, "FEED_RECONNECT_DELAY_MS", 3_000);

        Self {
            feed_url,
            http_addr,
            pipeline: PipelineConfig {
                queue_capacity: queue_capacity.max(1),
                store: StoreOptions {
                    shards: shards.max(1),
                    tie_break,
                },
            },
            reconnect: ReconnectPolicy {
                max_attempts: reconnect_attempts,
                delay: Duration::from_millis(reconnect_delay_ms),
            },
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(e) => {
            warn!(key, value = %raw, error = %e, "invalid config value; using default");
            default
        }
    }
}
