//! Feed connector boundary.
//!
//! A connector hands the tracker an ordered sequence of raw, still-encoded
//! messages and reports when the feed is gone. Handshakes, pings and
//! reconnection policy stay behind this trait.

pub mod channel;
pub mod ws;

use async_trait::async_trait;
use thiserror::Error;

pub use channel::{ChannelFeed, FeedSender};
pub use ws::{ReconnectPolicy, WsFeedConnector};

/// One serialized feed message, exactly as received.
pub type RawMessage = Vec<u8>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("feed disconnected: {0}")]
    Disconnected(String),
}

#[async_trait]
pub trait FeedConnector: Send {
    /// Next message in feed order.
    ///
    /// `Ok(None)` is an orderly disconnect; `Err` is a transport failure the
    /// connector could not recover from. Either way no further messages
    /// will arrive.
    async fn next_message(&mut self) -> Result<Option<RawMessage>, FeedError>;

    /// Release the transport. Called once by the receive loop on exit.
    async fn close(&mut self) {}
}
