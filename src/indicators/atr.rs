// =============================================================================
// Average True Range (ATR): Wilder's Smoothing Method
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar after the first:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_p   = SMA of TR_1 ..= TR_p
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14
// =============================================================================

use super::IndicatorResult;

/// True range of bar `i` (requires `i >= 1`).
fn true_range(high: &[f64], low: &[f64], close: &[f64], i: usize) -> f64 {
    let prev_close = close[i - 1];
    let hl = high[i] - low[i];
    let hc = (high[i] - prev_close).abs();
    let lc = (low[i] - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Compute the ATR series over whole `high`/`low`/`close` columns.
///
/// The window begins at index `period`: the first bar has no previous close,
/// so `period` true ranges are available only from there.
///
/// # Edge cases
/// - `period == 0` => empty result
/// - `len <= period` => empty result
pub fn calculate_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> IndicatorResult {
    let n = close.len().min(high.len()).min(low.len());
    if period == 0 || n <= period {
        return IndicatorResult::empty();
    }

    // --- Seed ATR with SMA of the first `period` TR values -------------------
    let period_f = period as f64;
    let seed: f64 = (1..=period)
        .map(|i| true_range(high, low, close, i))
        .sum::<f64>()
        / period_f;

    let mut result = Vec::with_capacity(n - period);
    result.push(seed);

    // --- Wilder's smoothing for remaining TR values --------------------------
    let mut atr = seed;
    for i in period + 1..n {
        atr = (atr * (period_f - 1.0) + true_range(high, low, close, i)) / period_f;
        result.push(atr);
    }

    IndicatorResult::new(period, result)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Split (high, low, close) bars into columns.
    fn columns(bars: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            bars.iter().map(|b| b.0).collect(),
            bars.iter().map(|b| b.1).collect(),
            bars.iter().map(|b| b.2).collect(),
        )
    }

    fn atr_of(bars: &[(f64, f64, f64)], period: usize) -> IndicatorResult {
        let (h, l, c) = columns(bars);
        calculate_atr(&h, &l, &c, period)
    }

    #[test]
    fn atr_period_zero() {
        let bars = vec![(105.0, 95.0, 102.0); 20];
        assert!(atr_of(&bars, 0).is_empty());
    }

    #[test]
    fn atr_insufficient_data() {
        // Need period + 1 = 15 bars for period=14.
        let bars = vec![(105.0, 95.0, 102.0); 14];
        assert!(atr_of(&bars, 14).is_empty());
    }

    #[test]
    fn atr_exact_minimum_data() {
        // period=3, 4 bars give exactly one value: mean of the 3 TRs.
        let bars = vec![
            (102.0, 98.0, 101.0),
            (104.0, 99.0, 103.0),  // TR = max(5, 3, 2) = 5
            (106.0, 100.0, 105.0), // TR = max(6, 3, 3) = 6
            (108.0, 102.0, 107.0), // TR = max(6, 3, 3) = 6
        ];
        let atr = atr_of(&bars, 3);
        assert_eq!(atr.begin(), 3);
        assert_eq!(atr.end(), 4);
        assert!((atr.values()[0] - 17.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn atr_wilder_step() {
        let bars = vec![
            (102.0, 98.0, 101.0),
            (104.0, 99.0, 103.0),  // 5
            (106.0, 100.0, 105.0), // 6
            (108.0, 102.0, 107.0), // 6
            (117.0, 107.0, 110.0), // max(10, 10, 0) = 10
        ];
        let atr = atr_of(&bars, 3);
        let seed = 17.0 / 3.0;
        let expected = (seed * 2.0 + 10.0) / 3.0;
        assert_eq!(atr.len(), 2);
        assert!((atr.values()[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn atr_constant_range() {
        // All bars have H-L=10 with close at midpoint and slight drift;
        // ATR should stay near 10.
        let bars: Vec<_> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                (base + 5.0, base - 5.0, base)
            })
            .collect();
        let atr = atr_of(&bars, 14);
        assert_eq!(atr.begin(), 14);
        assert_eq!(atr.end(), 30);
        for &v in atr.values() {
            assert!((v - 10.0).abs() < 1.0, "expected ATR near 10.0, got {v}");
        }
    }

    #[test]
    fn atr_true_range_uses_prev_close() {
        // Gap scenario: |H - prevClose| > H - L
        let bars = vec![
            (105.0, 95.0, 95.0),   // close at low
            (115.0, 108.0, 112.0), // gap up: |115-95|=20 > 115-108=7
            (118.0, 110.0, 115.0),
            (120.0, 113.0, 118.0),
        ];
        let atr = atr_of(&bars, 3);
        assert!(atr.values()[0] > 7.0, "ATR should reflect the gap");
    }
}
