// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the population standard deviation
// of the same window.
//
// The window slides in one pass.  Sums are kept relative to the first close
// of the series so large prices do not cancel away small variances.

use super::IndicatorResult;

/// One point of the three bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands for every full window of `closes`.
///
/// - `upper`  = SMA + `dev_up` * σ
/// - `middle` = SMA
/// - `lower`  = SMA - `dev_down` * σ
///
/// The window begins at index `period - 1`; fewer than `period` closes (or
/// `period == 0`) gives an empty result.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    dev_up: f64,
    dev_down: f64,
) -> IndicatorResult<BollingerBands> {
    if period == 0 || closes.len() < period {
        return IndicatorResult::empty();
    }

    let shift = closes[0];
    let period_f = period as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &c in &closes[..period - 1] {
        let d = c - shift;
        sum += d;
        sum_sq += d * d;
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    for i in period - 1..closes.len() {
        let d = closes[i] - shift;
        sum += d;
        sum_sq += d * d;

        let mean = sum / period_f;
        let variance = (sum_sq / period_f - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        let middle = shift + mean;
        result.push(BollingerBands {
            upper: middle + dev_up * std_dev,
            middle,
            lower: middle - dev_down * std_dev,
        });

        let leaving = closes[i + 1 - period] - shift;
        sum -= leaving;
        sum_sq -= leaving * leaving;
    }

    IndicatorResult::new(period - 1, result)
}
