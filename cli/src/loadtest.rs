use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Context;
use futures::{StreamExt, stream};
use tracing::{info, warn};

use crate::cli::{LoadtestArgs, symbols_or_default};

pub(crate) async fn run(args: LoadtestArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(args.concurrency)
        .build()
        .context("build http client")?;

    let symbols = symbols_or_default(&args.symbols);
    let base = args.url.trim_end_matches('/').to_string();

    info!(url = %base, total = args.total, concurrency = args.concurrency, "load test started");
    let started = Instant::now();

    let outcomes: Vec<Result<u16, String>> = stream::iter(0..args.total)
        .map(|i| {
            let client = client.clone();
            let url = format!("{}/latest-price?symbol={}", base, symbols[i % symbols.len()]);
            async move {
                client
                    .get(&url)
                    .send()
                    .await
                    .map(|resp| resp.status().as_u16())
                    .map_err(|e| e.to_string())
            }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let elapsed = started.elapsed();

    let mut by_status: BTreeMap<u16, usize> = BTreeMap::new();
    let mut failures = 0usize;
    for outcome in &outcomes {
        match outcome {
            Ok(code) => *by_status.entry(*code).or_default() += 1,
            Err(e) => {
                failures += 1;
                if failures <= 5 {
                    warn!(error = %e, "request failed");
                }
            }
        }
    }

    let rps = outcomes.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!("requests:    {}", outcomes.len());
    println!("elapsed:     {:.3}s", elapsed.as_secs_f64());
    println!("throughput:  {:.0} req/s", rps);
    for (code, count) in &by_status {
        println!("status {}:  {}", code, count);
    }
    if failures > 0 {
        println!("transport errors: {}", failures);
    }

    Ok(())
}
