
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use adapters::feed::channel;
use fixtures::ticker;
use tracker::http::{AppState, router};
use tracker::pipeline::{self, PipelineConfig, PipelineHandle};

async fn get(state: &AppState, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
    let resp = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

async fn seeded() -> anyhow::Result<(PipelineHandle, AppState)> {
    let (tx, feed) = channel::channel(8);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());
    let state = AppState::from_pipeline(&pipeline);

    tx.send_ticker(&ticker("BTCUSDT", 43_250.5, 1_700_000_000_000)).await?;
    tx.send_ticker(&ticker("ETHUSDT", 2_250.0, 1_700_000_000_001)).await?;
    drop(tx);

    pipeline.lifecycle().stopped().await;
    Ok((pipeline, state))
}

#[tokio::test]
async fn latest_price_returns_the_stored_entry() -> anyhow::Result<()> {
    let (_pipeline, state) = seeded().await?;

    let (status, body) = get(&state, "/latest-price?symbol=BTCUSDT").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "BTCUSDT");
    assert_eq!(body["price"], 43_250.5);
    assert_eq!(body["event_time"], 1_700_000_000_000i64);
    Ok(())
}

#[tokio::test]
async fn unknown_symbol_is_404() -> anyhow::Result<()> {
    let (_pipeline, state) = seeded().await?;

    let (status, body) = get(&state, "/latest-price?symbol=XRPUSDT").await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn missing_or_blank_symbol_is_400() -> anyhow::Result<()> {
    let (_pipeline, state) = seeded().await?;

    for uri in ["/latest-price", "/latest-price?symbol=", "/latest-price?symbol=%20"] {
        let (status, body) = get(&state, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "BAD_REQUEST");
    }
    Ok(())
}

#[tokio::test]
async fn health_reports_phase_and_counters() -> anyhow::Result<()> {
    let (_pipeline, state) = seeded().await?;

    let (status, body) = get(&state, "/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "stopped");
    assert_eq!(body["symbols"], 2);
    assert_eq!(body["counters"]["messages_received"], 2);
    assert_eq!(body["counters"]["updates_inserted"], 2);
    Ok(())
}

#[tokio::test]
async fn reads_are_served_after_shutdown() -> anyhow::Result<()> {
    let (pipeline, state) = seeded().await?;
    pipeline.shutdown();
    pipeline.join().await?;

    let (status, body) = get(&state, "/latest-price?symbol=ETHUSDT").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 2_250.0);
    Ok(())
}
