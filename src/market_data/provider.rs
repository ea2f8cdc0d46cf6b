use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};

use super::{PriceTable, TradingPair};

/// A market-data source that reports last-trade prices.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Last-trade prices for exactly `pairs`, in one batched request.
    async fn fetch_last_prices(&self, pairs: &[TradingPair]) -> Result<PriceTable>;

    /// Last-trade prices for every pair the source lists.
    async fn fetch_all_last_prices(&self) -> Result<PriceTable>;

    fn name(&self) -> &str;
}

/// Price source backed by a fixed in-memory table.
///
/// Either call can be made to fail, which lets callers exercise the
/// batched → fetch-all → empty degradation without a network.
#[derive(Debug, Default)]
pub struct StaticPriceSource {
    table: PriceTable,
    fail_batched: bool,
    fail_all: bool,
    batched_calls: AtomicUsize,
    all_calls: AtomicUsize,
}

impl StaticPriceSource {
    pub fn new(table: PriceTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn fail_batched(mut self) -> Self {
        self.fail_batched = true;
        self
    }

    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn batched_calls(&self) -> usize {
        self.batched_calls.load(Ordering::SeqCst)
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_last_prices(&self, pairs: &[TradingPair]) -> Result<PriceTable> {
        self.batched_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batched {
            return Err(anyhow!("static price source: batched fetch disabled"));
        }
        Ok(self.table.clone().restricted_to(pairs))
    }

    async fn fetch_all_last_prices(&self) -> Result<PriceTable> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(anyhow!("static price source: fetch-all disabled"));
        }
        Ok(self.table.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
