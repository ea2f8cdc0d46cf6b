//! OKX spot ticker provider.
//!
//! Uses the public market endpoints, no API key required.
//! Docs: https://www.okx.com/docs-v5/en/#public-data-rest-api
//!
//! Both calls read `GET /api/v5/market/tickers?instType=SPOT`; the batched
//! one keeps only the requested pairs.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::market_data::{PriceSource, PriceTable, TradingPair};

pub const OKX_API_BASE: &str = "https://www.okx.com";

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("OKX HTTP error: {status} - {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("OKX API error {code}: {message}")]
    Api { code: String, message: String },
    #[error("OKX returned no ticker for {0}")]
    MissingTicker(TradingPair),
    #[error("OKX ticker for {pair} has no usable last price: {last:?}")]
    BadPrice { pair: TradingPair, last: String },
}

#[derive(Debug, Deserialize)]
struct TickerEnvelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    inst_id: String,
    #[serde(default)]
    last: String,
}

impl Ticker {
    fn pair(&self) -> Option<TradingPair> {
        let (base, quote) = self.inst_id.split_once('-')?;
        Some(TradingPair::new(base, quote))
    }

    fn last_price(&self) -> Option<Decimal> {
        Decimal::from_str(self.last.trim()).ok()
    }
}

/// OKX spot price source.
pub struct OkxPriceSource {
    client: Client,
    base_url: String,
}

impl OkxPriceSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: OKX_API_BASE.to_string(),
        }
    }

    /// Point the client at another REST root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn inst_id(pair: &TradingPair) -> String {
        format!("{}-{}", pair.base, pair.quote)
    }

    async fn get_tickers(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Ticker>> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // OKX reports most failures with HTTP 200 and a non-zero code, but
        // some with 4xx plus the same envelope; prefer the envelope when present.
        let envelope = match serde_json::from_str::<TickerEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ExchangeError::Http { status, body }.into())
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to parse OKX ticker response"))
            }
        };

        if envelope.code != "0" {
            return Err(ExchangeError::Api {
                code: envelope.code,
                message: envelope.msg,
            }
            .into());
        }
        if !status.is_success() {
            return Err(ExchangeError::Http { status, body }.into());
        }

        Ok(envelope.data)
    }

    async fn spot_tickers(&self) -> Result<Vec<Ticker>> {
        self.get_tickers("/api/v5/market/tickers", &[("instType", "SPOT")]).await
    }
}

/// Pick exactly `pairs` out of a tickers listing.
fn select_pairs(tickers: Vec<Ticker>, pairs: &[TradingPair]) -> Result<PriceTable> {
    let by_inst_id: HashMap<String, Ticker> = tickers
        .into_iter()
        .map(|t| (t.inst_id.to_ascii_uppercase(), t))
        .collect();

    pairs
        .iter()
        .map(|pair| -> Result<(TradingPair, Decimal)> {
            let ticker = by_inst_id
                .get(&OkxPriceSource::inst_id(pair))
                .ok_or_else(|| ExchangeError::MissingTicker(pair.clone()))?;
            let last = ticker.last_price().ok_or_else(|| ExchangeError::BadPrice {
                pair: pair.clone(),
                last: ticker.last.clone(),
            })?;
            Ok((pair.clone(), last))
        })
        .collect()
}

impl Default for OkxPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PriceSource for OkxPriceSource {
    /// One spot-tickers request, narrowed to `pairs`. A pair OKX does not
    /// list, or lists without a usable last price, fails the whole call.
    async fn fetch_last_prices(&self, pairs: &[TradingPair]) -> Result<PriceTable> {
        select_pairs(self.spot_tickers().await?, pairs)
    }

    /// Every spot ticker. Tickers without a usable last price are left out.
    async fn fetch_all_last_prices(&self) -> Result<PriceTable> {
        let tickers = self.spot_tickers().await?;

        Ok(tickers
            .iter()
            .filter_map(|t| Some((t.pair()?, t.last_price()?)))
            .collect())
    }

    fn name(&self) -> &str {
        "okx"
    }
}
