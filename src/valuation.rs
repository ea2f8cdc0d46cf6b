//! Portfolio valuation: holdings × last prices → ranked snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::holdings::{normalize_symbol, Holdings};
use crate::market_data::{PriceTable, TradingPair};

/// Number of leading assets surfaced separately in snapshots and records.
pub const TOP_N: usize = 3;

/// How to treat a holding whose trading pair has no fetched price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPricePolicy {
    /// Keep the holding with price 0. This understates the total when the
    /// source is down or does not list the asset.
    #[default]
    Zero,
    /// Leave the holding out of the snapshot.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetValuation {
    pub coin: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub value: Decimal,
}

/// One valuation of the whole portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    /// The first `TOP_N` entries of `details`.
    pub top_3: Vec<AssetValuation>,
    /// Every valued asset, descending by value.
    pub details: Vec<AssetValuation>,
}

impl PortfolioSnapshot {
    /// Rank valuations by value (descending, ties keep input order) and total them.
    pub fn from_valuations(mut valuations: Vec<AssetValuation>) -> Self {
        let total_value = valuations
            .iter()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v.value));

        // `sort_by` is stable.
        valuations.sort_by(|a, b| b.value.cmp(&a.value));
        let top_3 = valuations.iter().take(TOP_N).cloned().collect();

        Self {
            total_value,
            top_3,
            details: valuations,
        }
    }

    pub fn value_of(&self, coin: &str) -> Option<Decimal> {
        self.details
            .iter()
            .find(|v| v.coin == coin)
            .map(|v| v.value)
    }
}

/// Values holdings against a price table, quoting everything in one stable asset.
#[derive(Debug, Clone)]
pub struct Valuer {
    stable_asset: String,
    missing_price: MissingPricePolicy,
}

impl Valuer {
    pub fn new(stable_asset: &str) -> Self {
        Self {
            stable_asset: normalize_symbol(stable_asset),
            missing_price: MissingPricePolicy::default(),
        }
    }

    pub fn with_missing_price_policy(mut self, policy: MissingPricePolicy) -> Self {
        self.missing_price = policy;
        self
    }

    pub fn stable_asset(&self) -> &str {
        &self.stable_asset
    }

    pub fn is_stable(&self, symbol: &str) -> bool {
        symbol == self.stable_asset
    }

    fn pair_for(&self, symbol: &str) -> TradingPair {
        TradingPair::new(symbol, &self.stable_asset)
    }

    /// Pairs that must be priced: every non-stable holding against the stable asset.
    pub fn pairs_needed(&self, holdings: &Holdings) -> Vec<TradingPair> {
        holdings
            .iter()
            .filter(|h| !self.is_stable(&h.symbol))
            .map(|h| self.pair_for(&h.symbol))
            .collect()
    }

    /// 1 for the stable asset, the fetched last price otherwise, `None` when
    /// the pair is missing from `prices`.
    pub fn price_for(&self, symbol: &str, prices: &PriceTable) -> Option<Decimal> {
        if self.is_stable(symbol) {
            Some(Decimal::ONE)
        } else {
            prices.get(&self.pair_for(symbol))
        }
    }

    /// Value every holding. Returns `None` when there are no holdings.
    pub fn value(&self, holdings: &Holdings, prices: &PriceTable) -> Option<PortfolioSnapshot> {
        if holdings.is_empty() {
            return None;
        }

        let valuations = holdings
            .iter()
            .filter_map(|h| {
                let price = match (self.price_for(&h.symbol, prices), self.missing_price) {
                    (Some(price), _) => price,
                    (None, MissingPricePolicy::Zero) => Decimal::ZERO,
                    (None, MissingPricePolicy::Skip) => return None,
                };
                Some(AssetValuation {
                    coin: h.symbol.clone(),
                    amount: h.amount,
                    price,
                    value: h.amount.saturating_mul(price),
                })
            })
            .collect();

        Some(PortfolioSnapshot::from_valuations(valuations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn prices(entries: &[(&str, &str)]) -> PriceTable {
        entries
            .iter()
            .map(|(pair, price)| (pair.parse().unwrap(), dec(price)))
            .collect()
    }

    #[test]
    fn values_btc_and_stable_asset() {
        let holdings: Holdings = [("BTC", dec("2")), ("USDT", dec("100"))].into_iter().collect();
        let snapshot = Valuer::new("USDT")
            .value(&holdings, &prices(&[("BTC/USDT", "50000")]))
            .unwrap();

        assert_eq!(snapshot.total_value, dec("100100"));
        assert_eq!(snapshot.top_3.len(), 2);
        assert_eq!(snapshot.top_3[0].coin, "BTC");
        assert_eq!(snapshot.top_3[0].value, dec("100000"));
        assert_eq!(snapshot.top_3[1].coin, "USDT");
        assert_eq!(snapshot.top_3[1].price, Decimal::ONE);
        assert_eq!(snapshot.top_3[1].value, dec("100"));
    }

    #[test]
    fn missing_price_counts_as_zero_by_default() {
        let holdings: Holdings = [("ETH", dec("3")), ("USDT", dec("5"))].into_iter().collect();
        let snapshot = Valuer::new("USDT")
            .value(&holdings, &PriceTable::new())
            .unwrap();

        assert_eq!(snapshot.total_value, dec("5"));
        assert_eq!(snapshot.details.len(), 2);
        assert_eq!(snapshot.value_of("ETH"), Some(Decimal::ZERO));
    }

    #[test]
    fn skip_policy_leaves_unpriced_assets_out() {
        let holdings: Holdings = [("ETH", dec("3")), ("USDT", dec("5"))].into_iter().collect();
        let snapshot = Valuer::new("USDT")
            .with_missing_price_policy(MissingPricePolicy::Skip)
            .value(&holdings, &PriceTable::new())
            .unwrap();

        assert_eq!(snapshot.details.len(), 1);
        assert_eq!(snapshot.value_of("ETH"), None);
        assert_eq!(snapshot.total_value, dec("5"));
    }

    #[test]
    fn empty_holdings_yield_no_snapshot() {
        assert!(Valuer::new("USDT")
            .value(&Holdings::new(), &PriceTable::new())
            .is_none());
    }

    #[test]
    fn ties_keep_first_seen_order_and_top_is_prefix() {
        let holdings: Holdings = [
            ("AAA", dec("1")),
            ("BBB", dec("1")),
            ("CCC", dec("10")),
            ("DDD", dec("1")),
            ("USDT", dec("0")),
        ]
        .into_iter()
        .collect();
        let table = prices(&[
            ("AAA/USDT", "2"),
            ("BBB/USDT", "2"),
            ("CCC/USDT", "1"),
            ("DDD/USDT", "2"),
        ]);
        let snapshot = Valuer::new("USDT").value(&holdings, &table).unwrap();

        let order: Vec<_> = snapshot.details.iter().map(|v| v.coin.as_str()).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB", "DDD", "USDT"]);
        assert_eq!(snapshot.top_3.as_slice(), &snapshot.details[..3]);
    }

    #[test]
    fn total_is_sum_of_amount_times_price() {
        let holdings: Holdings = [
            ("BTC", dec("0.5")),
            ("ETH", dec("1.25")),
            ("SOL", dec("7")),
            ("USDT", dec("12.34")),
        ]
        .into_iter()
        .collect();
        let table = prices(&[("BTC/USDT", "60000.1"), ("ETH/USDT", "2500.4")]);
        let valuer = Valuer::new("usdt");
        let snapshot = valuer.value(&holdings, &table).unwrap();

        let expected = holdings.iter().fold(Decimal::ZERO, |acc, h| {
            acc + h.amount * valuer.price_for(&h.symbol, &table).unwrap_or(Decimal::ZERO)
        });
        assert_eq!(snapshot.total_value, expected);
        assert_eq!(snapshot.total_value, dec("33137.89"));
    }

    #[test]
    fn pairs_needed_excludes_stable_asset() {
        let holdings: Holdings = [("BTC", dec("1")), ("USDT", dec("1")), ("ETH", dec("1"))]
            .into_iter()
            .collect();
        let pairs = Valuer::new("USDT").pairs_needed(&holdings);
        assert_eq!(
            pairs,
            vec![TradingPair::new("BTC", "USDT"), TradingPair::new("ETH", "USDT")]
        );
    }
}
