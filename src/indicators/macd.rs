// =============================================================================
// Moving Average Convergence / Divergence (MACD)
// =============================================================================
//
//   MACD      = EMA(close, fast) - EMA(close, slow)
//   Signal    = EMA(MACD, signal)
//   Histogram = MACD - Signal
//
// Every EMA is seeded with the SMA of its first `period` inputs (see
// `ema::calculate_ema`).  The MACD line exists from index `slow - 1`; the
// signal needs `signal` MACD values on top of that, so all three outputs
// share a window starting at `slow + signal - 2`.
// =============================================================================

use super::ema::calculate_ema;
use super::IndicatorResult;

/// One point of the three MACD outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD, signal and histogram over a full close column.
///
/// Returns an empty result when any period is zero or the series has no
/// more than `slow + signal - 2` closes.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> IndicatorResult<MacdValue> {
    if fast == 0 || slow == 0 || signal == 0 {
        return IndicatorResult::empty();
    }
    let line_begin = fast.max(slow) - 1;
    if closes.len() <= line_begin + signal - 1 {
        return IndicatorResult::empty();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let line: Vec<f64> = (line_begin..closes.len())
        .map(|i| {
            let f = fast_ema.at(i).copied().unwrap_or(f64::NAN);
            let s = slow_ema.at(i).copied().unwrap_or(f64::NAN);
            f - s
        })
        .collect();

    let signal_ema = calculate_ema(&line, signal);
    let values = signal_ema
        .values()
        .iter()
        .enumerate()
        .map(|(k, &sig)| {
            let macd = line[signal_ema.begin() + k];
            MacdValue {
                macd,
                signal: sig,
                histogram: macd - sig,
            }
        })
        .collect();

    IndicatorResult::new(line_begin + signal_ema.begin(), values)
}
