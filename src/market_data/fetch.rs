use tracing::warn;

use super::{PriceSource, PriceTable, TradingPair};

/// Outcome of fetching prices for a valuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceFetch {
    /// The batched request for the needed pairs succeeded.
    Complete(PriceTable),
    /// The batched request failed; the table comes from the fetch-all call.
    Fallback { prices: PriceTable, error: String },
    /// Both requests failed.
    Unavailable {
        batched_error: String,
        fallback_error: String,
    },
}

impl PriceFetch {
    /// Prices to value with. An unavailable source yields an empty table,
    /// so every non-stable holding is priced as missing.
    pub fn into_prices(self) -> PriceTable {
        match self {
            PriceFetch::Complete(prices) | PriceFetch::Fallback { prices, .. } => prices,
            PriceFetch::Unavailable { .. } => PriceTable::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, PriceFetch::Complete(_))
    }
}

/// Fetch last prices for `pairs`, falling back once to a fetch-all call.
///
/// With no pairs to price nothing is requested.
pub async fn fetch_prices_with_fallback(
    source: &dyn PriceSource,
    pairs: &[TradingPair],
) -> PriceFetch {
    if pairs.is_empty() {
        return PriceFetch::Complete(PriceTable::new());
    }

    let batched_error = match source.fetch_last_prices(pairs).await {
        Ok(prices) => return PriceFetch::Complete(prices),
        Err(e) => format!("{e:#}"),
    };
    warn!(
        source = source.name(),
        pairs = pairs.len(),
        error = %batched_error,
        "batched price fetch failed; falling back to all tickers"
    );

    match source.fetch_all_last_prices().await {
        Ok(prices) => PriceFetch::Fallback {
            prices,
            error: batched_error,
        },
        Err(e) => {
            let fallback_error = format!("{e:#}");
            warn!(
                source = source.name(),
                error = %fallback_error,
                "fallback price fetch failed; valuing without prices"
            );
            PriceFetch::Unavailable {
                batched_error,
                fallback_error,
            }
        }
    }
}
