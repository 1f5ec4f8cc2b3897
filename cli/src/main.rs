pub mod cli;
mod loadtest;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use adapters::simulator;
use cli::{Cli, Command};
use common::logger::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing("pricefeed", cli.json_logs);

    match cli.command {
        Command::Simulate(args) => {
            let listener = TcpListener::bind(args.addr)
                .await
                .with_context(|| format!("failed to bind {}", args.addr))?;

            simulator::serve(listener, args.simulator_config(), async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await?;
        }
        Command::Loadtest(args) => loadtest::run(args).await?,
    }

    Ok(())
}
