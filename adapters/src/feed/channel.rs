use anyhow::Context;
use async_trait::async_trait;
use corelib::TickerData;
use tokio::sync::mpsc;

use super::{FeedConnector, FeedError, RawMessage};

type Item = Result<RawMessage, FeedError>;

/// In-process feed: whatever is pushed through the paired [`FeedSender`]
/// comes out of `next_message` in the same order.
///
/// Dropping every sender is an orderly disconnect.
pub struct ChannelFeed {
    rx: mpsc::Receiver<Item>,
}

#[derive(Clone)]
pub struct FeedSender {
    tx: mpsc::Sender<Item>,
}

pub fn channel(capacity: usize) -> (FeedSender, ChannelFeed) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FeedSender { tx }, ChannelFeed { rx })
}

impl FeedSender {
    pub async fn send_raw(&self, raw: impl Into<RawMessage>) -> anyhow::Result<()> {
        self.tx
            .send(Ok(raw.into()))
            .await
            .map_err(|_| anyhow::anyhow!("channel feed was dropped"))
    }

    pub async fn send_ticker(&self, ticker: &TickerData) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(ticker).context("encode ticker")?;
        self.send_raw(raw).await
    }

    /// Deliver a transport failure; the feed ends after it.
    pub async fn fail(self, err: FeedError) -> anyhow::Result<()> {
        self.tx
            .send(Err(err))
            .await
            .map_err(|_| anyhow::anyhow!("channel feed was dropped"))
    }
}

#[async_trait]
impl FeedConnector for ChannelFeed {
    async fn next_message(&mut self) -> Result<Option<RawMessage>, FeedError> {
        match self.rx.recv().await {
            Some(Ok(raw)) => Ok(Some(raw)),
            Some(Err(e)) => {
                self.rx.close();
                Err(e)
            }
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_then_disconnects() -> anyhow::Result<()> {
        let (tx, mut feed) = channel(8);

        tx.send_raw(b"one".to_vec()).await?;
        tx.send_raw(b"two".to_vec()).await?;
        drop(tx);

        assert_eq!(feed.next_message().await?, Some(b"one".to_vec()));
        assert_eq!(feed.next_message().await?, Some(b"two".to_vec()));
        assert_eq!(feed.next_message().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn failure_is_surfaced() -> anyhow::Result<()> {
        let (tx, mut feed) = channel(8);

        tx.fail(FeedError::Disconnected("peer reset".into())).await?;

        let err = feed.next_message().await.unwrap_err();
        assert!(matches!(err, FeedError::Disconnected(r) if r == "peer reset"));
        Ok(())
    }

    #[tokio::test]
    async fn send_ticker_encodes_json() -> anyhow::Result<()> {
        let (tx, mut feed) = channel(1);
        let t = TickerData {
            symbol: "BTCUSDT".into(),
            price: 40_000.0,
            event_time: 7,
            ..Default::default()
        };

        tx.send_ticker(&t).await?;

        let raw = feed.next_message().await?.expect("message");
        let back: TickerData = serde_json::from_slice(&raw)?;
        assert_eq!(back, t);
        Ok(())
    }
}
