use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use adapters::feed::WsFeedConnector;
use common::logger::init_tracing;
use tracker::{
    config::AppConfig,
    http::{self, AppState},
    lifecycle::ShutdownReason,
    pipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing("tracker", is_production);

    let cfg = AppConfig::from_env();
    info!(feed_url = %cfg.feed_url, http_addr = %cfg.http_addr, "starting price tracker");

    let connector = WsFeedConnector::connect(cfg.feed_url.clone(), cfg.reconnect)
        .await
        .with_context(|| format!("failed to connect to feed {}", cfg.feed_url))?;

    let pipeline = pipeline::spawn(connector, &cfg.pipeline);

    // Ingestion may stop on its own (feed gone); queries keep being served.
    let lifecycle = pipeline.lifecycle();
    tokio::spawn(async move {
        lifecycle.stopped().await;
        match lifecycle.shutdown_reason() {
            Some(ShutdownReason::Requested) => {}
            reason => warn!(?reason, "ingestion stopped; serving last known prices"),
        }
    });

    let listener = TcpListener::bind(cfg.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.http_addr))?;
    let app = http::router(AppState::from_pipeline(&pipeline));

    let (http_stop_tx, http_stop_rx) = oneshot::channel::<()>();
    let mut server: http::ServerTask = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = http_stop_rx.await;
            })
            .await
    });
    info!(addr = %cfg.http_addr, "query service listening");

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C; shutting down");
        }
        info!("Shutdown signal received");
    };
    let waited = http::wait_for_signal(ctrl_c, &mut server).await;

    pipeline.shutdown();
    let report = pipeline.join().await?;
    info!(
        reason = ?report.reason,
        tracked_symbols = report.tracked_symbols,
        counters = ?report.counters,
        "ingestion pipeline stopped"
    );

    // Server already gone with an error; nothing left to stop.
    waited?;

    let _ = http_stop_tx.send(());
    server
        .await
        .context("http server task failed")?
        .context("http server failed")?;

    Ok(())
}
