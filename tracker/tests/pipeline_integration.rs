
use std::time::Duration;

use adapters::feed::{FeedError, channel};
use fixtures::{ticker, wait_until};
use tracker::lifecycle::{Phase, ShutdownReason};
use tracker::pipeline::{self, PipelineConfig};
use tracker::query::QueryOutcome;
use tracker::store::{StoreOptions, TieBreak};

#[tokio::test]
async fn out_of_order_updates_keep_the_newest_price() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(16);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());
    let query = pipeline.query();

    tx.send_ticker(&ticker("BTCUSDT", 1.0, 100)).await?;
    tx.send_ticker(&ticker("BTCUSDT", 2.0, 50)).await?;
    tx.send_ticker(&ticker("BTCUSDT", 3.0, 200)).await?;
    tx.send_ticker(&ticker("BTCUSDT", 4.0, 150)).await?;
    tx.send_ticker(&ticker("ETHUSDT", 10.0, 10)).await?;
    drop(tx);

    let report = pipeline.join().await?;

    let QueryOutcome::Found(btc) = query.latest_price("BTCUSDT")? else {
        panic!("BTCUSDT should be tracked");
    };
    assert_eq!(btc.price, 3.0);
    assert_eq!(btc.event_time, 200);

    let QueryOutcome::Found(eth) = query.latest_price("ETHUSDT")? else {
        panic!("ETHUSDT should be tracked");
    };
    assert_eq!(eth.price, 10.0);

    assert_eq!(report.tracked_symbols, 2);
    assert_eq!(report.merged.inserted, 2);
    assert_eq!(report.merged.replaced, 1);
    assert_eq!(report.merged.stale, 2);
    assert_eq!(report.counters.stale_dropped, 2);
    Ok(())
}

#[tokio::test]
async fn unknown_symbol_is_not_found() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(4);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());
    let query = pipeline.query();

    tx.send_ticker(&ticker("BTCUSDT", 1.0, 1)).await?;
    drop(tx);
    pipeline.join().await?;

    assert_eq!(query.latest_price("DOGEUSDT")?, QueryOutcome::NotFound);
    Ok(())
}

#[tokio::test]
async fn undecodable_messages_do_not_stop_ingestion() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(8);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());
    let query = pipeline.query();

    tx.send_raw(b"{not json".to_vec()).await?;
    tx.send_raw(br#"{"event_time":1,"symbol":"","price":1.0}"#.to_vec()).await?;
    tx.send_ticker(&ticker("SOLUSDT", 25.0, 7)).await?;
    drop(tx);

    let report = pipeline.join().await?;

    assert_eq!(report.counters.messages_received, 3);
    assert_eq!(report.counters.decode_failures, 2);
    assert_eq!(report.counters.records_enqueued, 1);
    assert!(matches!(query.latest_price("SOLUSDT")?, QueryOutcome::Found(e) if e.price == 25.0));
    Ok(())
}

#[tokio::test]
async fn explicit_shutdown_drains_every_enqueued_record() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(256);
    let cfg = PipelineConfig {
        queue_capacity: 4,
        ..PipelineConfig::default()
    };
    let pipeline = pipeline::spawn(feed, &cfg);
    let counters = pipeline.counters();

    for i in 0..200 {
        tx.send_ticker(&ticker(&format!("SYM{}", i % 10), i as f64, i)).await?;
    }

    assert!(wait_until(Duration::from_secs(2), || counters.snapshot().records_enqueued >= 20).await);
    assert!(pipeline.shutdown());
    assert!(!pipeline.shutdown(), "second trigger must be a no-op");

    let lifecycle = pipeline.lifecycle();
    let report = pipeline.join().await?;

    assert_eq!(report.reason, Some(ShutdownReason::Requested));
    assert_eq!(lifecycle.phase(), Phase::Stopped);
    assert_eq!(report.counters.merged(), report.counters.records_enqueued);
    assert_eq!(
        report.merged.inserted + report.merged.replaced + report.merged.stale,
        report.counters.records_enqueued
    );
    Ok(())
}

#[tokio::test]
async fn feed_failure_stops_ingestion_but_reads_continue() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(8);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());
    let query = pipeline.query();
    let lifecycle = pipeline.lifecycle();

    tx.send_ticker(&ticker("BTCUSDT", 42_000.0, 1_000)).await?;
    tx.fail(FeedError::Disconnected("peer reset".into())).await?;

    tokio::time::timeout(Duration::from_secs(2), lifecycle.stopped()).await?;

    assert!(matches!(
        lifecycle.shutdown_reason(),
        Some(ShutdownReason::TransportDisconnected(msg)) if msg.contains("peer reset")
    ));

    let QueryOutcome::Found(entry) = query.latest_price("BTCUSDT")? else {
        panic!("last known price should survive the disconnect");
    };
    assert_eq!(entry.price, 42_000.0);

    pipeline.join().await?;
    assert!(matches!(query.latest_price("BTCUSDT")?, QueryOutcome::Found(_)));
    Ok(())
}

#[tokio::test]
async fn last_applied_policy_flows_through_the_pipeline() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(8);
    let cfg = PipelineConfig {
        queue_capacity: 8,
        store: StoreOptions {
            shards: 4,
            tie_break: TieBreak::LastApplied,
        },
    };
    let pipeline = pipeline::spawn(feed, &cfg);
    let query = pipeline.query();

    tx.send_ticker(&ticker("ADAUSDT", 1.0, 5)).await?;
    tx.send_ticker(&ticker("ADAUSDT", 2.0, 5)).await?;
    drop(tx);
    pipeline.join().await?;

    assert!(matches!(query.latest_price("ADAUSDT")?, QueryOutcome::Found(e) if e.price == 2.0));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_observe_monotone_whole_entries() -> anyhow::Result<()> {
    let (tx, feed) = channel::channel(64);
    let pipeline = pipeline::spawn(feed, &PipelineConfig::default());

    let mut readers = Vec::new();
    for _ in 0..4 {
        let query = pipeline.query();
        readers.push(tokio::spawn(async move {
            let mut last_seen = -1;
            for _ in 0..2_000 {
                if let Ok(QueryOutcome::Found(entry)) = query.latest_price("BTCUSDT") {
                    // price mirrors event_time, so a torn entry would show a mismatch
                    assert_eq!(entry.price, entry.event_time as f64);
                    assert!(entry.event_time >= last_seen);
                    last_seen = entry.event_time;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for t in 0..1_000 {
        tx.send_ticker(&ticker("BTCUSDT", t as f64, t)).await?;
    }
    drop(tx);

    for reader in readers {
        reader.await?;
    }
    pipeline.join().await?;
    Ok(())
}
