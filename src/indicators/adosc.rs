// =============================================================================
// Chaikin Accumulation / Distribution Oscillator (ADOSC)
// =============================================================================
//
// Accumulation / Distribution line:
//   MFM_t = ((C - L) - (H - C)) / (H - L)      (0 when H == L)
//   AD_t  = AD_{t-1} + MFM_t * V_t
//
// Oscillator:
//   ADOSC_t = EMA(AD, fast)_t - EMA(AD, slow)_t
//
// Both EMAs start from the first AD value and are updated on every bar, so
// the oscillator is reported once the slower average has seen `slow` bars,
// i.e. from index `slow - 1`.
// =============================================================================

use super::ema::multiplier;
use super::IndicatorResult;

/// Money flow multiplier of one bar.
fn money_flow_multiplier(high: f64, low: f64, close: f64) -> f64 {
    let range = high - low;
    if range == 0.0 {
        return 0.0;
    }
    ((close - low) - (high - close)) / range
}

/// Running Accumulation / Distribution line over whole columns.
pub fn ad_line(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len().min(high.len()).min(low.len()).min(volume.len());
    let mut ad = 0.0;
    (0..n)
        .map(|i| {
            ad += money_flow_multiplier(high[i], low[i], close[i]) * volume[i];
            ad
        })
        .collect()
}

/// Compute the oscillator over whole columns.
///
/// Returns an empty result when either period is zero or the series has no
/// more than `max(fast, slow) - 1` bars.
pub fn calculate_adosc(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    fast: usize,
    slow: usize,
) -> IndicatorResult {
    if fast == 0 || slow == 0 {
        return IndicatorResult::empty();
    }
    let lookback = fast.max(slow) - 1;
    let ad = ad_line(high, low, close, volume);
    if ad.len() <= lookback {
        return IndicatorResult::empty();
    }

    let k_fast = multiplier(fast);
    let k_slow = multiplier(slow);
    let mut fast_ema = ad[0];
    let mut slow_ema = ad[0];

    let mut result = Vec::with_capacity(ad.len() - lookback);
    for (i, &value) in ad.iter().enumerate().skip(1) {
        fast_ema += k_fast * (value - fast_ema);
        slow_ema += k_slow * (value - slow_ema);
        if i >= lookback {
            result.push(fast_ema - slow_ema);
        }
    }
    if lookback == 0 {
        // Single-bar averages: the first bar is already a full window.
        result.insert(0, 0.0);
    }

    IndicatorResult::new(lookback, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (high, low, close, volume) bars.
    fn columns(bars: &[(f64, f64, f64, f64)]) -> [Vec<f64>; 4] {
        [
            bars.iter().map(|b| b.0).collect(),
            bars.iter().map(|b| b.1).collect(),
            bars.iter().map(|b| b.2).collect(),
            bars.iter().map(|b| b.3).collect(),
        ]
    }

    fn sample() -> Vec<(f64, f64, f64, f64)> {
        vec![
            (10.0, 8.0, 9.0, 100.0),   // mfm 0
            (12.0, 10.0, 12.0, 200.0), // mfm 1   => +200
            (12.0, 12.0, 12.0, 50.0),  // h == l  => 0
            (13.0, 10.0, 10.0, 300.0), // mfm -1  => -300
        ]
    }

    #[test]
    fn ad_line_accumulates() {
        let [h, l, c, v] = columns(&sample());
        assert_eq!(ad_line(&h, &l, &c, &v), vec![0.0, 200.0, 200.0, -100.0]);
    }

    #[test]
    fn adosc_hand_computed() {
        let [h, l, c, v] = columns(&sample());
        let out = calculate_adosc(&h, &l, &c, &v, 2, 3);
        assert_eq!(out.begin(), 2);
        assert_eq!(out.end(), 4);

        let (kf, ks) = (2.0 / 3.0, 0.5);
        let (mut f, mut s) = (0.0, 0.0);
        let mut expected = Vec::new();
        for (i, ad) in [0.0, 200.0, 200.0, -100.0].into_iter().enumerate().skip(1) {
            f += kf * (ad - f);
            s += ks * (ad - s);
            if i >= 2 {
                expected.push(f - s);
            }
        }
        for (got, want) in out.values().iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn adosc_short_series_is_empty() {
        let [h, l, c, v] = columns(&sample());
        assert!(calculate_adosc(&h, &l, &c, &v, 3, 10).is_empty());
        assert!(calculate_adosc(&h, &l, &c, &v, 0, 3).is_empty());
        assert_eq!(calculate_adosc(&h, &l, &c, &v, 2, 4).len(), 1);
    }

    #[test]
    fn adosc_window_bounds_default_periods() {
        let bars: Vec<_> = (0..50)
            .map(|i| {
                let b = 20.0 + (i as f64 * 0.4).cos() * 2.0;
                (b + 1.0, b - 1.0, b + 0.25, 500.0)
            })
            .collect();
        let [h, l, c, v] = columns(&bars);
        let out = calculate_adosc(&h, &l, &c, &v, 3, 10);
        assert_eq!(out.begin(), 9);
        assert_eq!(out.end(), 50);
        assert!(out.values().iter().all(|v| v.is_finite()));
    }
}
