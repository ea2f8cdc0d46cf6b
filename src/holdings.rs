//! Holdings loader.
//!
//! Reads `Symbol,Amount` rows from a CSV file into an insertion-ordered
//! symbol → amount map. The loader never fails: problems are reported as a
//! [`HoldingsLoad`] outcome and callers that only want data use
//! [`HoldingsLoad::into_holdings`], which degrades to an empty map.

use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

pub const SYMBOL_COLUMN: &str = "Symbol";
pub const AMOUNT_COLUMN: &str = "Amount";

const UTF8_BOM: char = '\u{feff}';

/// One held asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub amount: Decimal,
}

/// Symbol → amount, in first-seen order.
///
/// Re-inserting a symbol overwrites its amount but keeps its first
/// position, so ranking ties resolve by first appearance in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Holdings {
    entries: Vec<Holding>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a holding. The symbol is trimmed and uppercased.
    pub fn insert(&mut self, symbol: &str, amount: Decimal) {
        let symbol = normalize_symbol(symbol);
        match self.entries.iter_mut().find(|h| h.symbol == symbol) {
            Some(existing) => existing.amount = amount,
            None => self.entries.push(Holding { symbol, amount }),
        }
    }

    #[cfg(test)]
    pub fn get(&self, symbol: &str) -> Option<Decimal> {
        let symbol = normalize_symbol(symbol);
        self.entries
            .iter()
            .find(|h| h.symbol == symbol)
            .map(|h| h.amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Decimal)> for Holdings {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut holdings = Holdings::new();
        for (symbol, amount) in iter {
            holdings.insert(symbol.as_ref(), amount);
        }
        holdings
    }
}

/// Outcome of reading a holdings source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingsLoad {
    /// The source was read. `skipped` counts rows that were dropped.
    Loaded { holdings: Holdings, skipped: usize },
    /// The source does not exist.
    Missing,
    /// The source exists but could not be read as a holdings table.
    Unreadable(String),
}

impl HoldingsLoad {
    /// Holdings to value; any failure counts as "no data".
    pub fn into_holdings(self) -> Holdings {
        match self {
            HoldingsLoad::Loaded { holdings, .. } => holdings,
            HoldingsLoad::Missing | HoldingsLoad::Unreadable(_) => Holdings::new(),
        }
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Load holdings from a CSV file on disk.
pub async fn load_holdings(path: &Path) -> HoldingsLoad {
    match tokio::fs::read(path).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => parse_holdings(&content),
            Err(e) => HoldingsLoad::Unreadable(format!("{}: {e}", path.display())),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HoldingsLoad::Missing,
        Err(e) => HoldingsLoad::Unreadable(format!("{}: {e}", path.display())),
    }
}

/// Parse holdings from CSV text with a `Symbol,Amount` header.
///
/// A leading byte-order mark is ignored. Rows with an empty symbol, a
/// missing cell, or an amount that is not a non-negative number are skipped.
pub fn parse_holdings(content: &str) -> HoldingsLoad {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return HoldingsLoad::Unreadable(e.to_string()),
    };
    let (Some(symbol_idx), Some(amount_idx)) = (
        column_index(&headers, SYMBOL_COLUMN),
        column_index(&headers, AMOUNT_COLUMN),
    ) else {
        return HoldingsLoad::Unreadable(format!(
            "header must contain {SYMBOL_COLUMN} and {AMOUNT_COLUMN} columns"
        ));
    };

    let mut holdings = Holdings::new();
    let mut skipped = 0;

    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => return HoldingsLoad::Unreadable(e.to_string()),
        };

        let parsed = record
            .get(symbol_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .zip(record.get(amount_idx).and_then(parse_amount));

        match parsed {
            Some((symbol, amount)) => holdings.insert(symbol, amount),
            None => {
                debug!(row = row + 1, record = ?record, "skipping holdings row");
                skipped += 1;
            }
        }
    }

    HoldingsLoad::Loaded { holdings, skipped }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Parse an amount cell. Plain decimals and scientific notation are accepted.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let amount = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()?;
    (!amount.is_sign_negative() || amount.is_zero()).then_some(amount)
}
