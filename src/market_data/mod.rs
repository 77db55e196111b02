pub mod candle;
pub mod csv_io;

// Re-export the series types for convenient access (e.g. `use crate::market_data::CandleSeries`).
pub use candle::{
    Candle, CandleSeries, IndicatorField, IndicatorValues, ParseReport, PriceColumns, PriceField,
    RawRow, RowOutcome, SkippedRow,
};
pub use csv_io::{write_series, CandleReader};
