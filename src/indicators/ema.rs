// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` values.
// =============================================================================

use super::IndicatorResult;

/// Smoothing factor `2 / (period + 1)`.
pub fn multiplier(period: usize) -> f64 {
    2.0 / (period + 1) as f64
}

/// Compute the EMA series for `values` and look-back `period`.
///
/// The window begins at index `period - 1`, where the SMA seed sits.
///
/// # Edge cases
/// - `period == 0` => empty result
/// - `values.len() < period` => empty result
/// - A non-finite input poisons every later value; the window is unchanged.
pub fn calculate_ema(values: &[f64], period: usize) -> IndicatorResult {
    if period == 0 || values.len() < period {
        return IndicatorResult::empty();
    }

    let k = multiplier(period);

    // Seed: SMA of the first `period` values.
    let sma: f64 = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &value in &values[period..] {
        let ema = value * k + prev_ema * (1.0 - k);
        result.push(ema);
        prev_ema = ema;
    }

    IndicatorResult::new(period - 1, result)
}
