// =============================================================================
// ohlcv-augment: enrich per-symbol OHLCV candle files with indicators
// =============================================================================

pub mod driver;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod processor;
pub mod run_config;
pub mod worker_pool;
