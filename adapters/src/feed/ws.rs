use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{FeedConnector, FeedError, RawMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How hard the connector tries to get a lost feed back before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// 0 disables reconnection: the first disconnect is surfaced.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            delay: Duration::from_secs(3),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Market-data feed over a WebSocket.
///
/// Text and binary frames are yielded verbatim; pings are answered here and
/// never reach the caller.
pub struct WsFeedConnector {
    url: String,
    policy: ReconnectPolicy,
    stream: Option<WsStream>,
}

impl WsFeedConnector {
    /// Dial the feed. The initial connect is not retried.
    pub async fn connect(url: impl Into<String>, policy: ReconnectPolicy) -> Result<Self, FeedError> {
        let url = url.into();
        let stream = Self::open(&url).await?;

        Ok(Self {
            url,
            policy,
            stream: Some(stream),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open(url: &str) -> Result<WsStream, FeedError> {
        info!(url = %url, "connecting to feed");
        let (ws, _) = connect_async(url).await?;
        info!(url = %url, "feed connection established");
        Ok(ws)
    }

    async fn reconnect(&mut self, cause: FeedError) -> Result<(), FeedError> {
        let mut last = cause;

        for attempt in 1..=self.policy.max_attempts {
            warn!(
                url = %self.url,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = self.policy.delay.as_millis() as u64,
                error = %last,
                "feed lost; reconnecting"
            );
            tokio::time::sleep(self.policy.delay).await;

            match Self::open(&self.url).await {
                Ok(ws) => {
                    self.stream = Some(ws);
                    return Ok(());
                }
                Err(e) => last = e,
            }
        }

        Err(last)
    }
}

#[async_trait]
impl FeedConnector for WsFeedConnector {
    async fn next_message(&mut self) -> Result<Option<RawMessage>, FeedError> {
        loop {
            let Some(ws) = self.stream.as_mut() else {
                return Ok(None);
            };

            let lost = match ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws.send(Message::Pong(data)).await {
                        debug!(error = %e, "failed to answer ping");
                    }
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    FeedError::Disconnected(format!("server sent close frame: {frame:?}"))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => FeedError::WebSocket(e),
                None => FeedError::Disconnected("stream ended".into()),
            };

            self.stream = None;

            if self.policy.max_attempts == 0 {
                return match lost {
                    FeedError::Disconnected(reason) => {
                        info!(url = %self.url, reason = %reason, "feed disconnected");
                        Ok(None)
                    }
                    e => Err(e),
                };
            }

            self.reconnect(lost).await?;
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.stream.take() {
            if let Err(e) = ws.close(None).await {
                debug!(url = %self.url, error = %e, "close handshake failed");
            }
        }
    }
}
