//! HTTP surface of the query service.
//!
//! - `GET /latest-price?symbol=BTCUSDT` → `{ symbol, price, event_time }`
//! - `GET /health` → pipeline phase, tracked symbols and counters

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use corelib::StoreEntry;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;
use crate::lifecycle::{Lifecycle, Phase};
use crate::metrics::{Counters, CountersSnapshot};
use crate::pipeline::PipelineHandle;
use crate::query::{QueryOutcome, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub lifecycle: Arc<Lifecycle>,
    pub counters: Counters,
}

impl AppState {
    pub fn from_pipeline(pipeline: &PipelineHandle) -> Self {
        Self {
            query: pipeline.query(),
            lifecycle: pipeline.lifecycle(),
            counters: pipeline.counters(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/latest-price", get(latest_price))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LatestPriceParams {
    symbol: Option<String>,
}

async fn latest_price(
    State(state): State<AppState>,
    Query(params): Query<LatestPriceParams>,
) -> Result<Json<StoreEntry>, ApiError> {
    let symbol = params.symbol.unwrap_or_default();

    match state.query.latest_price(&symbol)? {
        QueryOutcome::Found(entry) => {
            debug!(symbol = %entry.symbol, price = entry.price, event_time = entry.event_time, "latest price served");
            Ok(Json(entry))
        }
        QueryOutcome::NotFound => Err(ApiError::NotFound(symbol.trim().to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub phase: Phase,
    pub symbols: usize,
    pub counters: CountersSnapshot,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        phase: state.lifecycle.phase(),
        symbols: state.query.tracked_symbols(),
        counters: state.counters.snapshot(),
    })
}

/// Spawned `axum::serve` future.
pub type ServerTask = JoinHandle<std::io::Result<()>>;

/// Wait for `signal`, unless the server task ends first.
///
/// A server that exits before the signal is an error, even when it
/// returned `Ok`.
pub async fn wait_for_signal<S>(signal: S, server: &mut ServerTask) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => Ok(()),
        res = server => {
            res.context("http server task failed")?
                .context("http server failed")?;
            anyhow::bail!("http server exited before shutdown was requested")
        }
    }
}
