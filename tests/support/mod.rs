#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use coinboard::clock::FixedClock;
use coinboard::market_data::{PriceTable, StaticPriceSource, TradingPair};
use coinboard::portfolio::PortfolioService;
use coinboard::storage::HistoryStore;
use rust_decimal::Decimal;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// `(base, price)` pairs quoted in USDT.
pub fn usdt_prices(entries: &[(&str, &str)]) -> PriceTable {
    entries
        .iter()
        .map(|(base, price)| (TradingPair::new(base, "USDT"), dec(price)))
        .collect()
}

pub fn write_holdings(dir: &Path, rows: &str) -> Result<PathBuf> {
    let path = dir.join("portfolio.csv");
    std::fs::write(&path, format!("Symbol,Amount\n{rows}"))?;
    Ok(path)
}

pub fn service_at(
    holdings: &Path,
    prices: Arc<StaticPriceSource>,
    history: Arc<dyn HistoryStore>,
    now: NaiveDateTime,
) -> PortfolioService {
    PortfolioService::new(holdings, prices, history).with_clock(Arc::new(FixedClock::new(now)))
}
