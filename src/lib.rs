pub mod clock;
pub mod config;
pub mod duration;
pub mod format;
pub mod history;
pub mod holdings;
pub mod market_data;
pub mod portfolio;
pub mod storage;
pub mod valuation;
