use std::net::SocketAddr;
use std::time::Duration;

use adapters::simulator::{DEFAULT_SYMBOLS, GeneratorConfig, SimulatorConfig};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "pricefeed", version)]
pub struct Cli {
    /// Emit JSON logs instead of the pretty format
    #[clap(long, global = true, env = "PRICEFEED_JSON_LOGS")]
    pub json_logs: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve a synthetic ticker feed over WebSocket
    Simulate(SimulateArgs),
    /// Hammer the tracker's /latest-price route and report throughput
    Loadtest(LoadtestArgs),
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[clap(long, default_value = "127.0.0.1:8081", env = "SIMULATOR_ADDR")]
    pub addr: SocketAddr,

    /// Delay between tickers on each connection
    #[clap(long, default_value_t = 1)]
    pub interval_ms: u64,

    /// Fixed RNG seed for reproducible feeds
    #[clap(long)]
    pub seed: Option<u64>,

    /// Share of tickers back-dated to exercise stale-drop
    #[clap(long, default_value_t = 0.05)]
    pub stale_ratio: f64,

    #[clap(long, default_value_t = 4_000)]
    pub stale_window_ms: i64,

    /// Symbol universe (comma-separated); defaults to the built-in 20
    #[clap(long, value_delimiter = ',')]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LoadtestArgs {
    #[clap(long, default_value = "http://127.0.0.1:8080", env = "TRACKER_URL")]
    pub url: String,

    /// Total number of requests
    #[clap(long, default_value_t = 100_000)]
    pub total: usize,

    /// Requests in flight at once
    #[clap(long, default_value_t = 1_000)]
    pub concurrency: usize,

    /// Symbols to query round-robin; defaults to the built-in 20
    #[clap(long, value_delimiter = ',')]
    pub symbols: Vec<String>,
}

pub(crate) fn symbols_or_default(symbols: &[String]) -> Vec<String> {
    if symbols.is_empty() {
        DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        symbols.to_vec()
    }
}

impl SimulateArgs {
    pub(crate) fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            interval: Duration::from_millis(self.interval_ms.max(1)),
            generator: GeneratorConfig {
                symbols: symbols_or_default(&self.symbols),
                stale_ratio: self.stale_ratio,
                stale_window_ms: self.stale_window_ms,
                seed: self.seed,
            },
        }
    }
}
