use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::{ParseError, RangeError};

// ---------------------------------------------------------------------------
// Field identifiers
// ---------------------------------------------------------------------------

/// One of the five numeric OHLCV columns of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    Close,
    High,
    Low,
    Volume,
}

impl PriceField {
    /// Header order of the price columns in output files.
    pub const ALL: [PriceField; 5] = [
        PriceField::Open,
        PriceField::Close,
        PriceField::High,
        PriceField::Low,
        PriceField::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::High => "high",
            Self::Low => "low",
            Self::Volume => "volume",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::High => 2,
            Self::Low => 3,
            Self::Volume => 4,
        }
    }
}

impl std::fmt::Display for PriceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One computed value slot on a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Adosc,
    Atr,
    UpperBand,
    MiddleBand,
    LowerBand,
    Macd,
    MacdSignal,
    MacdHist,
    Mfi,
    Rsi,
}

impl IndicatorField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Adosc => "adosc",
            Self::Atr => "atr",
            Self::UpperBand => "upper_band",
            Self::MiddleBand => "middle_band",
            Self::LowerBand => "lower_band",
            Self::Macd => "macd",
            Self::MacdSignal => "macd_signal",
            Self::MacdHist => "macd_hist",
            Self::Mfi => "mfi",
            Self::Rsi => "rsi",
        }
    }
}

impl std::fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Candle
// ---------------------------------------------------------------------------

/// Indicator slots attached to a candle. `None` means "not computed".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    pub adosc: Option<f64>,
    pub atr: Option<f64>,
    pub upper_band: Option<f64>,
    pub middle_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub mfi: Option<f64>,
    pub rsi: Option<f64>,
}

impl IndicatorValues {
    pub fn get(&self, field: IndicatorField) -> Option<f64> {
        *self.slot(field)
    }

    fn slot(&self, field: IndicatorField) -> &Option<f64> {
        match field {
            IndicatorField::Adosc => &self.adosc,
            IndicatorField::Atr => &self.atr,
            IndicatorField::UpperBand => &self.upper_band,
            IndicatorField::MiddleBand => &self.middle_band,
            IndicatorField::LowerBand => &self.lower_band,
            IndicatorField::Macd => &self.macd,
            IndicatorField::MacdSignal => &self.macd_signal,
            IndicatorField::MacdHist => &self.macd_hist,
            IndicatorField::Mfi => &self.mfi,
            IndicatorField::Rsi => &self.rsi,
        }
    }

    fn slot_mut(&mut self, field: IndicatorField) -> &mut Option<f64> {
        match field {
            IndicatorField::Adosc => &mut self.adosc,
            IndicatorField::Atr => &mut self.atr,
            IndicatorField::UpperBand => &mut self.upper_band,
            IndicatorField::MiddleBand => &mut self.middle_band,
            IndicatorField::LowerBand => &mut self.lower_band,
            IndicatorField::Macd => &mut self.macd,
            IndicatorField::MacdSignal => &mut self.macd_signal,
            IndicatorField::MacdHist => &mut self.macd_hist,
            IndicatorField::Mfi => &mut self.mfi,
            IndicatorField::Rsi => &mut self.rsi,
        }
    }
}

/// A single OHLCV observation read from an input file.
///
/// Price fields whose column is absent from the input header hold `NaN`
/// and are written back out as empty fields.  `event_time` is the parsed
/// instant in epoch milliseconds; `event_time_text` is the field exactly as
/// read, and is what gets written back out.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub event_time: i64,
    pub event_time_text: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub indicators: IndicatorValues,
}

impl Candle {
    pub fn new(event_time: i64, open: f64, close: f64, high: f64, low: f64, volume: f64) -> Self {
        Self {
            event_time,
            event_time_text: event_time.to_string(),
            open,
            close,
            high,
            low,
            volume,
            indicators: IndicatorValues::default(),
        }
    }

    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::Close => self.close,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Volume => self.volume,
        }
    }

    fn price_mut(&mut self, field: PriceField) -> &mut f64 {
        match field {
            PriceField::Open => &mut self.open,
            PriceField::Close => &mut self.close,
            PriceField::High => &mut self.high,
            PriceField::Low => &mut self.low,
            PriceField::Volume => &mut self.volume,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw rows and parse outcomes
// ---------------------------------------------------------------------------

/// Text fields of one input record, already mapped to their columns.
///
/// A `None` price means the column is not part of the file header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub event_time: String,
    pub prices: [Option<String>; 5],
}

impl RawRow {
    pub fn set_price(&mut self, field: PriceField, value: impl Into<String>) {
        self.prices[field.index()] = Some(value.into());
    }

    fn price(&self, field: PriceField) -> Option<&str> {
        self.prices[field.index()].as_deref()
    }
}

/// A row that was rejected while loading.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: ParseError,
}

/// Outcome of converting one raw row into a candle.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Parsed(Candle),
    Skipped(SkippedRow),
}

impl RowOutcome {
    pub fn from_raw(row: Result<RawRow, ParseError>) -> Self {
        match row.and_then(|raw| parse_row(&raw)) {
            Ok(candle) => Self::Parsed(candle),
            Err(reason) => Self::Skipped(SkippedRow {
                line: reason.line(),
                reason,
            }),
        }
    }
}

/// Summary of a `CandleSeries::load` pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedRow>,
}

fn parse_row(raw: &RawRow) -> Result<Candle, ParseError> {
    let event_time =
        parse_timestamp(&raw.event_time).ok_or_else(|| ParseError::InvalidTimestamp {
            line: raw.line,
            column: "event_time",
            value: raw.event_time.clone(),
        })?;

    let mut candle = Candle::new(event_time, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    candle.event_time_text = raw.event_time.trim().to_string();
    for field in PriceField::ALL {
        if let Some(text) = raw.price(field) {
            *candle.price_mut(field) = parse_number(text).ok_or_else(|| {
                ParseError::InvalidNumber {
                    line: raw.line,
                    column: field.name(),
                    value: text.to_string(),
                }
            })?;
        }
    }
    Ok(candle)
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an `event_time` field into epoch milliseconds.
///
/// Accepts integers, floats (truncated), `YYYY-MM-DD HH:MM:SS` (UTC) and
/// RFC 3339 strings.  The result validates the field; output files carry
/// the original text.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(ts) = text.parse::<i64>() {
        return Some(ts);
    }
    if let Ok(ts) = text.parse::<f64>() {
        return ts.is_finite().then_some(ts as i64);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

// ---------------------------------------------------------------------------
// CandleSeries
// ---------------------------------------------------------------------------

/// Ordered candles for one symbol, in input order.
///
/// The series is filled once by [`CandleSeries::load`]; afterwards only the
/// indicator slots change, through [`CandleSeries::apply`].
#[derive(Debug, Clone)]
pub struct CandleSeries {
    symbol: String,
    candles: Vec<Candle>,
    present: [bool; 5],
}

impl CandleSeries {
    /// Create an empty series whose input carries every price column.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_columns(symbol, &PriceField::ALL)
    }

    /// Create an empty series whose input carries only `columns`.
    pub fn with_columns(symbol: impl Into<String>, columns: &[PriceField]) -> Self {
        let mut present = [false; 5];
        for field in columns {
            present[field.index()] = true;
        }
        Self {
            symbol: symbol.into(),
            candles: Vec::new(),
            present,
        }
    }

    /// Append every parseable row in order; rejected rows are logged and
    /// collected in the returned report.
    pub fn load<I>(&mut self, rows: I) -> ParseReport
    where
        I: IntoIterator<Item = Result<RawRow, ParseError>>,
    {
        let mut report = ParseReport::default();
        for row in rows {
            match RowOutcome::from_raw(row) {
                RowOutcome::Parsed(candle) => {
                    self.candles.push(candle);
                    report.loaded += 1;
                }
                RowOutcome::Skipped(skipped) => {
                    warn!(
                        symbol = %self.symbol,
                        line = skipped.line,
                        reason = %skipped.reason,
                        "skipping malformed row"
                    );
                    report.skipped.push(skipped);
                }
            }
        }
        debug!(
            symbol = %self.symbol,
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "series loaded"
        );
        report
    }

    /// Dense copy of one price column in series order.
    pub fn column(&self, field: PriceField) -> Vec<f64> {
        self.candles.iter().map(|c| c.price(field)).collect()
    }

    /// Write `values[i - begin]` into `field` of candle `i` for every `i` in
    /// `[begin, end)`. Nothing is written when the range is invalid.
    pub fn apply(
        &mut self,
        field: IndicatorField,
        begin: usize,
        end: usize,
        values: &[f64],
    ) -> Result<(), RangeError> {
        if begin > end || end > self.candles.len() || values.len() != end - begin {
            return Err(RangeError {
                field,
                begin,
                end,
                values: values.len(),
                len: self.candles.len(),
            });
        }
        for (candle, &value) in self.candles[begin..end].iter_mut().zip(values) {
            *candle.indicators.slot_mut(field) = Some(value);
        }
        Ok(())
    }

    pub fn has_column(&self, field: PriceField) -> bool {
        self.present[field.index()]
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// The five OHLCV columns of a series, derived once per processing run.
#[derive(Debug, Clone, Default)]
pub struct PriceColumns {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl PriceColumns {
    pub fn from_series(series: &CandleSeries) -> Self {
        Self {
            open: series.column(PriceField::Open),
            high: series.column(PriceField::High),
            low: series.column(PriceField::Low),
            close: series.column(PriceField::Close),
            volume: series.column(PriceField::Volume),
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}
