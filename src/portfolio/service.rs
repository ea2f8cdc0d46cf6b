// src/portfolio/service.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::history::{upsert_last, HistoryRecord, Placement, RecordKind};
use crate::holdings::{load_holdings, Holdings, HoldingsLoad};
use crate::market_data::{fetch_prices_with_fallback, PriceSource};
use crate::storage::{HistoryLoad, HistoryStore, JsonHistoryStore};
use crate::valuation::{PortfolioSnapshot, Valuer};

use super::DEFAULT_SNAPSHOT_TIME;

/// Result of one scheduled snapshot run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// No holdings to value; history was left untouched.
    NoData,
    Appended(HistoryRecord),
    /// Today's record already existed and was overwritten.
    Replaced(HistoryRecord),
}

/// Valuation and history pipeline.
///
/// Holds the shared exchange client and the history store. The scheduled
/// path is the only writer of the store; request paths only read it.
pub struct PortfolioService {
    holdings_path: PathBuf,
    prices: Arc<dyn PriceSource>,
    history: Arc<dyn HistoryStore>,
    valuer: Valuer,
    snapshot_time: NaiveTime,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl PortfolioService {
    pub fn new(
        holdings_path: impl AsRef<Path>,
        prices: Arc<dyn PriceSource>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            holdings_path: holdings_path.as_ref().to_path_buf(),
            prices,
            history,
            valuer: Valuer::new("USDT"),
            snapshot_time: DEFAULT_SNAPSHOT_TIME,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    /// Wire the service from a resolved config, storing history as JSON.
    pub fn from_config(config: &ResolvedConfig, prices: Arc<dyn PriceSource>) -> Self {
        let valuer = Valuer::new(&config.price_source.quote_asset)
            .with_missing_price_policy(config.valuation.missing_price);

        Self::new(
            &config.holdings_path,
            prices,
            Arc::new(JsonHistoryStore::new(&config.history_path)),
        )
        .with_valuer(valuer)
        .with_snapshot_time(config.schedule.snapshot_time)
    }

    pub fn with_valuer(mut self, valuer: Valuer) -> Self {
        self.valuer = valuer;
        self
    }

    pub fn with_snapshot_time(mut self, snapshot_time: NaiveTime) -> Self {
        self.snapshot_time = snapshot_time;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn snapshot_time(&self) -> NaiveTime {
        self.snapshot_time
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn load_holdings(&self) -> HoldingsLoad {
        let load = load_holdings(&self.holdings_path).await;
        match &load {
            HoldingsLoad::Loaded { skipped, .. } if *skipped > 0 => {
                warn!(
                    path = %self.holdings_path.display(),
                    skipped,
                    "skipped unparseable holdings rows"
                );
            }
            HoldingsLoad::Unreadable(reason) => {
                warn!(path = %self.holdings_path.display(), reason = %reason, "holdings unreadable");
            }
            _ => {}
        }
        load
    }

    /// Price and value `holdings`. `None` when there is nothing to value.
    pub async fn value_holdings(&self, holdings: &Holdings) -> Option<PortfolioSnapshot> {
        if holdings.is_empty() {
            return None;
        }

        let pairs = self.valuer.pairs_needed(holdings);
        let prices = fetch_prices_with_fallback(self.prices.as_ref(), &pairs)
            .await
            .into_prices();

        self.valuer.value(holdings, &prices)
    }

    /// Load the holdings file and value it. `None` means "no data".
    pub async fn compute_valuation(&self) -> Option<PortfolioSnapshot> {
        let holdings = self.load_holdings().await.into_holdings();
        self.value_holdings(&holdings).await
    }

    /// Build a record for `snapshot`. Scheduled records are stamped with the
    /// configured time of day; live ones with the current minute.
    pub fn build_record(&self, snapshot: &PortfolioSnapshot, scheduled: bool) -> HistoryRecord {
        let kind = if scheduled {
            RecordKind::Scheduled {
                at: self.snapshot_time,
            }
        } else {
            RecordKind::Live
        };
        HistoryRecord::build(snapshot, kind, self.clock.now())
    }

    async fn load_history(&self) -> Vec<HistoryRecord> {
        let load = self.history.load().await;
        if let HistoryLoad::Corrupt(reason) = &load {
            warn!(reason = %reason, "history store unreadable; treating as empty");
        }
        load.into_records()
    }

    /// Value the portfolio and store today's scheduled record, replacing
    /// the last record when it carries the same timestamp.
    pub async fn run_scheduled_snapshot(&self) -> Result<SnapshotOutcome> {
        let _guard = self.write_lock.lock().await;

        let Some(snapshot) = self.compute_valuation().await else {
            info!("no holdings to value; scheduled snapshot skipped");
            return Ok(SnapshotOutcome::NoData);
        };

        let mut history = self.load_history().await;
        let record = self.build_record(&snapshot, true);
        let placement = upsert_last(&mut history, record.clone());

        self.history
            .save(&history)
            .await
            .context("Failed to persist history")?;

        info!(
            time = %record.time,
            total = %record.total,
            records = history.len(),
            replaced = placement == Placement::Replaced,
            "scheduled snapshot saved"
        );

        Ok(match placement {
            Placement::Appended => SnapshotOutcome::Appended(record),
            Placement::Replaced => SnapshotOutcome::Replaced(record),
        })
    }

    /// Persisted history plus, when the portfolio can be valued, one live
    /// record at the end. Never writes.
    pub async fn display_history(&self) -> Vec<HistoryRecord> {
        let mut history = self.load_history().await;
        if let Some(snapshot) = self.compute_valuation().await {
            history.push(self.build_record(&snapshot, false));
        }
        history
    }

    /// Create an empty history store if none exists. No record is written.
    pub async fn bootstrap(&self) -> Result<bool> {
        let created = self.history.ensure_initialized().await?;
        if created {
            info!("initialized empty history store");
        }
        Ok(created)
    }
}
