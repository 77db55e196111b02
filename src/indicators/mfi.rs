// =============================================================================
// Money Flow Index (MFI)
// =============================================================================
//
// A volume-weighted RSI over typical price.
//
//   TP_t   = (H + L + C) / 3
//   flow_t = TP_t * V_t            positive if TP_t > TP_{t-1},
//                                  negative if TP_t < TP_{t-1}, else neither
//   MFI_t  = 100 - 100 / (1 + sum(pos, p) / sum(neg, p))
//
// The sums cover the `period` flows of bars t-p+1 ..= t, so the first value
// sits at index `period`.  Sums slide through a single pass over the series.
// =============================================================================

use super::IndicatorResult;

#[derive(Debug, Clone, Copy, Default)]
struct Flow {
    positive: f64,
    negative: f64,
}

/// Compute the MFI series over whole columns.
///
/// # Edge cases
/// - `period == 0` => empty result
/// - `len <= period` => empty result
/// - No negative flow inside a window => exactly 100.0
/// - No positive flow inside a window => exactly 0.0
pub fn calculate_mfi(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    period: usize,
) -> IndicatorResult {
    let n = close.len().min(high.len()).min(low.len()).min(volume.len());
    if period == 0 || n <= period {
        return IndicatorResult::empty();
    }

    let typical = |i: usize| (high[i] + low[i] + close[i]) / 3.0;

    // flows[i] describes bar i; flows[0] stays zero.
    let mut flows = vec![Flow::default(); n];
    let mut prev_tp = typical(0);
    for (i, flow) in flows.iter_mut().enumerate().skip(1) {
        let tp = typical(i);
        let raw = tp * volume[i];
        if tp > prev_tp {
            flow.positive = raw;
        } else if tp < prev_tp {
            flow.negative = raw;
        }
        prev_tp = tp;
    }

    // Sliding sums.  Bars on each side are also counted so a window with no
    // flow on one side is recognised exactly, independent of rounding residue.
    let mut window = FlowWindow::default();
    for &flow in &flows[1..=period] {
        window.add(flow);
    }

    let mut result = Vec::with_capacity(n - period);
    result.push(window.mfi());

    for i in period + 1..n {
        window.add(flows[i]);
        window.remove(flows[i - period]);
        result.push(window.mfi());
    }

    IndicatorResult::new(period, result)
}

#[derive(Debug, Default)]
struct FlowWindow {
    pos_sum: f64,
    neg_sum: f64,
    pos_bars: usize,
    neg_bars: usize,
}

impl FlowWindow {
    fn add(&mut self, flow: Flow) {
        self.pos_sum += flow.positive;
        self.neg_sum += flow.negative;
        self.pos_bars += usize::from(flow.positive != 0.0);
        self.neg_bars += usize::from(flow.negative != 0.0);
    }

    fn remove(&mut self, flow: Flow) {
        self.pos_sum -= flow.positive;
        self.neg_sum -= flow.negative;
        self.pos_bars -= usize::from(flow.positive != 0.0);
        self.neg_bars -= usize::from(flow.negative != 0.0);
    }

    fn mfi(&self) -> f64 {
        if self.neg_bars == 0 || self.neg_sum <= 0.0 {
            return 100.0;
        }
        if self.pos_bars == 0 || self.pos_sum <= 0.0 {
            return 0.0;
        }
        (100.0 - 100.0 / (1.0 + self.pos_sum / self.neg_sum)).clamp(0.0, 100.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// (high, low, close, volume) bars.
    fn mfi_of(bars: &[(f64, f64, f64, f64)], period: usize) -> IndicatorResult {
        let h: Vec<f64> = bars.iter().map(|b| b.0).collect();
        let l: Vec<f64> = bars.iter().map(|b| b.1).collect();
        let c: Vec<f64> = bars.iter().map(|b| b.2).collect();
        let v: Vec<f64> = bars.iter().map(|b| b.3).collect();
        calculate_mfi(&h, &l, &c, &v, period)
    }

    fn sample() -> Vec<(f64, f64, f64, f64)> {
        vec![
            (10.0, 8.0, 9.0, 100.0),   // tp 9
            (11.0, 9.0, 10.0, 200.0),  // tp 10  +2000
            (10.0, 8.0, 9.0, 100.0),   // tp 9   -900
            (12.0, 10.0, 11.0, 300.0), // tp 11  +3300
            (11.0, 9.0, 10.0, 100.0),  // tp 10  -1000
        ]
    }

    #[test]
    fn mfi_short_series_is_empty() {
        assert!(mfi_of(&sample()[..3], 3).is_empty());
        assert!(mfi_of(&[], 14).is_empty());
        assert!(mfi_of(&sample(), 0).is_empty());
    }

    #[test]
    fn mfi_hand_computed() {
        let mfi = mfi_of(&sample(), 3);
        assert_eq!(mfi.begin(), 3);
        assert_eq!(mfi.end(), 5);

        let first = 100.0 * 5300.0 / (5300.0 + 900.0);
        let second = 100.0 * 3300.0 / (3300.0 + 1900.0);
        assert!((mfi.values()[0] - first).abs() < 1e-9);
        assert!((mfi.values()[1] - second).abs() < 1e-9);
    }

    #[test]
    fn mfi_without_negative_flow_is_100() {
        let bars: Vec<_> = (0..20)
            .map(|i| {
                let b = 10.0 + i as f64;
                (b + 2.0, b - 1.0, b + 1.0, 100.0 + i as f64)
            })
            .collect();
        let mfi = mfi_of(&bars, 14);
        assert_eq!(mfi.begin(), 14);
        for &v in mfi.values() {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn mfi_returns_to_100_after_losses_leave_window() {
        // One down bar early, then strictly rising: once the down bar slides
        // out of the window the value must be exactly 100.
        let mut bars = vec![(10.0, 8.0, 9.0, 100.0), (9.0, 7.0, 8.0, 333.3)];
        for i in 0..10 {
            let b = 9.0 + i as f64;
            bars.push((b + 1.0, b - 1.0, b, 123.4));
        }
        let mfi = mfi_of(&bars, 3);
        assert!(mfi.values()[0] < 100.0);
        assert_eq!(*mfi.values().last().unwrap(), 100.0);
    }

    #[test]
    fn mfi_range_check() {
        let bars: Vec<_> = (0..60)
            .map(|i| {
                let b = 50.0 + (i as f64 * 0.9).sin() * 4.0;
                (b + 1.5, b - 1.5, b + 0.3, 1000.0 + (i % 7) as f64 * 50.0)
            })
            .collect();
        let mfi = mfi_of(&bars, 14);
        assert_eq!(mfi.len(), 60 - 14);
        for &v in mfi.values() {
            assert!((0.0..=100.0).contains(&v), "MFI {v} out of range");
        }
    }

    #[test]
    fn mfi_without_positive_flow_is_0() {
        let bars: Vec<_> = (0..20)
            .map(|i| {
                let b = 100.0 - i as f64 * 1.3;
                (b + 2.0, b - 1.0, b + 0.7, 250.0 + i as f64 * 3.1)
            })
            .collect();
        let mfi = mfi_of(&bars, 14);
        assert_eq!(mfi.begin(), 14);
        for &v in mfi.values() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn mfi_is_0_once_gains_leave_window() {
        // 40 rising bars then 40 falling ones: the sliding positive sum keeps
        // rounding residue after the last up bar leaves, the value must not.
        let bars: Vec<_> = (0..80)
            .map(|i| {
                let b = if i < 40 {
                    100.0 + i as f64 * 0.37
                } else {
                    100.0 + (79 - i) as f64 * 0.37 - 0.11
                };
                (b + 1.1, b - 0.9, b + 0.13, 1000.0 + (i % 9) as f64 * 17.3)
            })
            .collect();
        let mfi = mfi_of(&bars, 14);
        for &v in &mfi.values()[mfi.len() - 10..] {
            assert_eq!(v, 0.0);
        }
        assert!(mfi.values().iter().all(|v| (0.0..=100.0).contains(v)));
    }
}
