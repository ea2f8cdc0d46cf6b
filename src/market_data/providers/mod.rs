pub mod okx;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Exchange, PriceSourceConfig};
use crate::market_data::PriceSource;

pub use okx::{ExchangeError, OkxPriceSource};

/// Build the configured exchange client. Called once at process start; the
/// result is shared by the request path and the scheduler.
pub fn build_price_source(config: &PriceSourceConfig) -> Result<Arc<dyn PriceSource>> {
    match config.exchange {
        Exchange::Okx => {
            let mut source = OkxPriceSource::new().with_base_url(&config.base_url);
            if let Some(timeout) = config.timeout {
                source = source.with_timeout(timeout)?;
            }
            Ok(Arc::new(source))
        }
    }
}
