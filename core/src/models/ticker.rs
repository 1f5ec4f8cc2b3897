//! Ticker message as published by the market-data feed.
//!
//! Only `symbol`, `price` and `event_time` matter to the tracker; the
//! remaining 24h-statistics fields are carried so the simulator can emit
//! realistic payloads, and default to zero when a producer omits them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerData {
    /// Event time in ms since epoch, assigned by the source.
    pub event_time: i64,
    pub symbol: String,
    pub price: f64,

    #[serde(default)]
    pub price_change: f64,
    #[serde(default)]
    pub price_change_percent: f64,
    #[serde(default)]
    pub weighted_avg_price: f64,
    #[serde(default)]
    pub prev_close_price: f64,
    #[serde(default)]
    pub last_qty: f64,
    #[serde(default)]
    pub bid_price: f64,
    #[serde(default)]
    pub ask_price: f64,
    #[serde(default)]
    pub open_price: f64,
    #[serde(default)]
    pub high_price: f64,
    #[serde(default)]
    pub low_price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub quote_volume: f64,

    /// Statistics window open/close (ms since epoch).
    #[serde(default)]
    pub open_time: i64,
    #[serde(default)]
    pub close_time: i64,

    #[serde(default)]
    pub first_id: i64,
    #[serde(default)]
    pub last_id: i64,
    #[serde(default)]
    pub count: i64,
}
