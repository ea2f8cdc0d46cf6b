use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A base/quote market, written `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_uppercase(),
            quote: quote.as_ref().trim().to_uppercase(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((base, quote)) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(Self::new(base, quote))
            }
            _ => bail!("Invalid trading pair (expected BASE/QUOTE): {s}"),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

/// Last-trade prices keyed by trading pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTable {
    prices: HashMap<TradingPair, Decimal>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: TradingPair, last: Decimal) {
        self.prices.insert(pair, last);
    }

    pub fn get(&self, pair: &TradingPair) -> Option<Decimal> {
        self.prices.get(pair).copied()
    }

    pub fn contains(&self, pair: &TradingPair) -> bool {
        self.prices.contains_key(pair)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Keep only the given pairs.
    pub fn restricted_to(mut self, pairs: &[TradingPair]) -> Self {
        self.prices.retain(|pair, _| pairs.contains(pair));
        self
    }
}

impl FromIterator<(TradingPair, Decimal)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (TradingPair, Decimal)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}
