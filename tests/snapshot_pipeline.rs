mod support;

use std::sync::Arc;

use anyhow::Result;
use coinboard::config::Config;
use coinboard::history::{HistoryRecord, RecordKind};
use coinboard::market_data::StaticPriceSource;
use coinboard::portfolio::{SnapshotOutcome, DEFAULT_SNAPSHOT_TIME};
use coinboard::storage::MemoryHistoryStore;
use coinboard::valuation::{MissingPricePolicy, Valuer};
use rust_decimal::Decimal;
use support::{at, dec, service_at, usdt_prices, write_holdings};
use tempfile::TempDir;

fn btc_at_50k() -> Arc<StaticPriceSource> {
    Arc::new(StaticPriceSource::new(usdt_prices(&[("BTC", "50000")])))
}

#[tokio::test]
async fn values_and_records_two_asset_portfolio() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,2\nUSDT,100\n")?;
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 14, 5));

    let snapshot = service.compute_valuation().await.expect("snapshot");
    assert_eq!(snapshot.total_value, dec("100100"));
    let coins: Vec<&str> = snapshot.top_3.iter().map(|v| v.coin.as_str()).collect();
    assert_eq!(coins, ["BTC", "USDT"]);
    assert_eq!(snapshot.top_3[1].price, Decimal::ONE);

    let outcome = service.run_scheduled_snapshot().await?;
    let SnapshotOutcome::Appended(record) = outcome else {
        panic!("expected append, got {outcome:?}");
    };
    assert_eq!(record.time, "2026-05-01 22:00");
    assert_eq!(record.total, dec("100100"));
    assert_eq!(record.top1_coin, "BTC");
    assert_eq!(record.top1_val, dec("100000"));
    assert_eq!(record.top2_coin, "USDT");
    assert_eq!(record.top2_val, dec("100"));
    assert_eq!(record.top3_coin, "N/A");
    assert_eq!(record.top3_val, Decimal::ZERO);
    assert_eq!(record.values.get("BTC"), Some(&dec("100000")));

    assert_eq!(store.records().await, vec![record]);
    Ok(())
}

#[tokio::test]
async fn second_run_on_same_day_replaces_last_record() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,1\n")?;
    let store = Arc::new(MemoryHistoryStore::new());

    let first = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 22, 0));
    assert!(matches!(
        first.run_scheduled_snapshot().await?,
        SnapshotOutcome::Appended(_)
    ));

    write_holdings(dir.path(), "BTC,3\n")?;
    let second = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 23, 30));
    assert!(matches!(
        second.run_scheduled_snapshot().await?,
        SnapshotOutcome::Replaced(_)
    ));

    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total, dec("150000"));

    let next_day = service_at(&holdings, btc_at_50k(), store.clone(), at(2, 22, 0));
    assert!(matches!(
        next_day.run_scheduled_snapshot().await?,
        SnapshotOutcome::Appended(_)
    ));

    let times: Vec<String> = store.records().await.into_iter().map(|r| r.time).collect();
    assert_eq!(times, ["2026-05-01 22:00", "2026-05-02 22:00"]);
    Ok(())
}

#[tokio::test]
async fn only_the_last_record_is_compared() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "USDT,10\n")?;
    let service = service_at(
        &holdings,
        btc_at_50k(),
        Arc::new(MemoryHistoryStore::new()),
        at(1, 9, 0),
    );
    let snapshot = service.compute_valuation().await.expect("snapshot");

    let kind = RecordKind::Scheduled {
        at: service.snapshot_time(),
    };
    let today = HistoryRecord::build(&snapshot, kind, at(1, 9, 0));
    let later = HistoryRecord {
        time: "2026-05-01 23:00".to_string(),
        ..today.clone()
    };
    let store = Arc::new(MemoryHistoryStore::with_records(vec![today, later]));
    let service = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 22, 0));

    assert!(matches!(
        service.run_scheduled_snapshot().await?,
        SnapshotOutcome::Appended(_)
    ));
    assert_eq!(store.records().await.len(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_holdings_leave_history_untouched() -> Result<()> {
    let seed_dir = TempDir::new()?;
    let seed = service_at(
        &write_holdings(seed_dir.path(), "USDT,5\n")?,
        btc_at_50k(),
        Arc::new(MemoryHistoryStore::new()),
        at(1, 9, 0),
    );
    let snapshot = seed.compute_valuation().await.expect("snapshot");
    let existing = vec![seed.build_record(&snapshot, true)];

    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "")?;
    let store = Arc::new(MemoryHistoryStore::with_records(existing.clone()));
    let prices = btc_at_50k();
    let service = service_at(&holdings, prices.clone(), store.clone(), at(2, 22, 0));

    assert!(service.compute_valuation().await.is_none());
    assert_eq!(service.run_scheduled_snapshot().await?, SnapshotOutcome::NoData);
    assert_eq!(service.display_history().await, existing);
    assert_eq!(store.save_count(), 0);
    assert_eq!(prices.batched_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_holdings_file_is_no_data() -> Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(MemoryHistoryStore::new());
    let service = service_at(
        &dir.path().join("nope.csv"),
        btc_at_50k(),
        store.clone(),
        at(1, 22, 0),
    );

    assert_eq!(service.run_scheduled_snapshot().await?, SnapshotOutcome::NoData);
    assert!(service.display_history().await.is_empty());
    assert_eq!(store.save_count(), 0);
    Ok(())
}

#[tokio::test]
async fn stable_only_portfolio_makes_no_price_requests() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "usdt,250.5\n")?;
    let prices = btc_at_50k();
    let service = service_at(&holdings, prices.clone(), Arc::new(MemoryHistoryStore::new()), at(1, 9, 0));

    let snapshot = service.compute_valuation().await.expect("snapshot");
    assert_eq!(snapshot.total_value, dec("250.5"));
    assert_eq!(prices.batched_calls(), 0);
    assert_eq!(prices.all_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn batched_failure_falls_back_to_all_tickers() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,2\nETH,10\n")?;
    let prices = Arc::new(
        StaticPriceSource::new(usdt_prices(&[("BTC", "50000"), ("ETH", "3000"), ("SOL", "150")]))
            .fail_batched(),
    );
    let service = service_at(&holdings, prices.clone(), Arc::new(MemoryHistoryStore::new()), at(1, 9, 0));

    let snapshot = service.compute_valuation().await.expect("snapshot");
    assert_eq!(snapshot.total_value, dec("130000"));
    assert_eq!(snapshot.details.len(), 2);
    assert_eq!(prices.batched_calls(), 1);
    assert_eq!(prices.all_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn unavailable_prices_value_non_stable_assets_at_zero() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,2\nUSDT,100\n")?;
    let prices = Arc::new(
        StaticPriceSource::new(usdt_prices(&[("BTC", "50000")]))
            .fail_batched()
            .fail_all(),
    );
    let service = service_at(&holdings, prices.clone(), Arc::new(MemoryHistoryStore::new()), at(1, 9, 0));

    let snapshot = service.compute_valuation().await.expect("snapshot");
    assert_eq!(snapshot.total_value, dec("100"));
    assert_eq!(snapshot.top_3[0].coin, "USDT");
    assert_eq!(snapshot.top_3[1].coin, "BTC");
    assert_eq!(snapshot.top_3[1].value, Decimal::ZERO);
    assert_eq!(prices.all_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn skip_policy_drops_unpriced_assets() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,1\nDOGE,1000\n")?;
    let service = service_at(&holdings, btc_at_50k(), Arc::new(MemoryHistoryStore::new()), at(1, 9, 0))
        .with_valuer(Valuer::new("USDT").with_missing_price_policy(MissingPricePolicy::Skip));

    let snapshot = service.compute_valuation().await.expect("snapshot");
    assert_eq!(snapshot.details.len(), 1);
    assert_eq!(snapshot.value_of("DOGE"), None);
    assert_eq!(snapshot.total_value, dec("50000"));
    Ok(())
}

#[tokio::test]
async fn display_history_adds_unsaved_live_point() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,1\n")?;
    let store = Arc::new(MemoryHistoryStore::new());

    let scheduled = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 22, 0));
    scheduled.run_scheduled_snapshot().await?;

    let live = service_at(&holdings, btc_at_50k(), store.clone(), at(2, 14, 37));
    let history = live.display_history().await;
    let times: Vec<&str> = history.iter().map(|r| r.time.as_str()).collect();
    assert_eq!(times, ["2026-05-01 22:00", "2026-05-02 14:37"]);

    assert_eq!(store.save_count(), 1);
    assert_eq!(store.records().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn corrupt_history_is_replaced_on_next_run() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,1\n")?;
    let store = Arc::new(MemoryHistoryStore::corrupt());
    let service = service_at(&holdings, btc_at_50k(), store.clone(), at(1, 22, 0));

    let history = service.display_history().await;
    assert_eq!(history.len(), 1, "only the live point");

    assert!(matches!(
        service.run_scheduled_snapshot().await?,
        SnapshotOutcome::Appended(_)
    ));
    assert_eq!(store.records().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn service_and_config_default_to_the_same_snapshot_time() -> Result<()> {
    let dir = TempDir::new()?;
    let holdings = write_holdings(dir.path(), "BTC,1\n")?;
    let service = service_at(
        &holdings,
        btc_at_50k(),
        Arc::new(MemoryHistoryStore::new()),
        at(1, 9, 0),
    );

    let configured = Config::default().schedule.snapshot_time;
    assert_eq!(service.snapshot_time(), DEFAULT_SNAPSHOT_TIME);
    assert_eq!(configured, DEFAULT_SNAPSHOT_TIME);
    assert_eq!(DEFAULT_SNAPSHOT_TIME.format("%H:%M").to_string(), "22:00");
    Ok(())
}
