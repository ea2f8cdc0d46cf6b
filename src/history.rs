//! Timestamped portfolio records kept as a daily time series.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::valuation::{AssetValuation, PortfolioSnapshot};

/// Minute-granularity timestamp format of [`HistoryRecord::time`].
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Coin name written into top-N slots the portfolio cannot fill.
pub const EMPTY_SLOT_COIN: &str = "N/A";

/// Which path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Written by the daily scheduler; stamped with the configured time of
    /// day rather than the trigger time.
    Scheduled { at: NaiveTime },
    /// Computed for a single request and never persisted.
    Live,
}

impl RecordKind {
    /// Timestamp a record of this kind gets when built at `now`.
    pub fn timestamp(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            RecordKind::Scheduled { at } => now.date().and_time(*at),
            RecordKind::Live => now
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(now),
        }
    }
}

/// One point of the portfolio history.
///
/// The flat `topN_coin` / `topN_val` layout is the on-disk format of
/// `history.json`; `values` was added later and is empty in older files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: String,
    pub total: Decimal,
    pub top1_coin: String,
    pub top1_val: Decimal,
    pub top2_coin: String,
    pub top2_val: Decimal,
    pub top3_coin: String,
    pub top3_val: Decimal,
    /// Value of every coin at snapshot time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Decimal>,
}

impl HistoryRecord {
    pub fn build(snapshot: &PortfolioSnapshot, kind: RecordKind, now: NaiveDateTime) -> Self {
        let slot = |i: usize| -> (String, Decimal) {
            match snapshot.top_3.get(i) {
                Some(AssetValuation { coin, value, .. }) => (coin.clone(), *value),
                None => (EMPTY_SLOT_COIN.to_string(), Decimal::ZERO),
            }
        };
        let (top1_coin, top1_val) = slot(0);
        let (top2_coin, top2_val) = slot(1);
        let (top3_coin, top3_val) = slot(2);

        Self {
            time: kind.timestamp(now).format(RECORD_TIME_FORMAT).to_string(),
            total: snapshot.total_value,
            top1_coin,
            top1_val,
            top2_coin,
            top2_val,
            top3_coin,
            top3_val,
            values: snapshot
                .details
                .iter()
                .map(|v| (v.coin.clone(), v.value))
                .collect(),
        }
    }
}

/// Where a new scheduled record went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Appended,
    /// The last record had the same timestamp and was overwritten.
    Replaced,
}

/// Add `record` to `history`, replacing the last entry instead when it has
/// the same timestamp. Only the last entry is compared.
pub fn upsert_last(history: &mut Vec<HistoryRecord>, record: HistoryRecord) -> Placement {
    match history.last_mut() {
        Some(last) if last.time == record.time => {
            *last = record;
            Placement::Replaced
        }
        _ => {
            history.push(record);
            Placement::Appended
        }
    }
}
