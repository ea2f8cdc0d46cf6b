mod fetch;
mod models;
mod provider;
#[cfg(feature = "market_data")]
pub mod providers;

pub use fetch::{fetch_prices_with_fallback, PriceFetch};
pub use models::{PriceTable, TradingPair};
pub use provider::{PriceSource, StaticPriceSource};
