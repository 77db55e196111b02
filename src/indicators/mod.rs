// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, whole-series implementations of the indicators attached to every
// candle file.  Each function takes column slices (oldest first) and returns
// an `IndicatorResult`: the half-open window `[begin, end)` of series indices
// that carry a value, plus those values.  A series too short for the
// indicator's lookback yields an empty result, never an error.

pub mod adosc;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod mfi;
pub mod rsi;

pub use engine::{Indicator, IndicatorBackend, IndicatorOutput, IndicatorParams};

/// Output of one indicator over a full series.
///
/// `values[k]` belongs to series index `begin + k`; indices outside
/// `[begin, end)` have no value.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult<T = f64> {
    begin: usize,
    values: Vec<T>,
}

impl<T> IndicatorResult<T> {
    pub fn new(begin: usize, values: Vec<T>) -> Self {
        Self { begin, values }
    }

    /// The "no data" result (`begin == end`).
    pub fn empty() -> Self {
        Self {
            begin: 0,
            values: Vec::new(),
        }
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> usize {
        self.begin + self.values.len()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at series index `index`, if it falls inside the window.
    pub fn at(&self, index: usize) -> Option<&T> {
        index
            .checked_sub(self.begin)
            .and_then(|k| self.values.get(k))
    }

    /// Project every value, keeping the window.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> IndicatorResult<U> {
        IndicatorResult {
            begin: self.begin,
            values: self.values.iter().map(f).collect(),
        }
    }
}
