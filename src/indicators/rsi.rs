// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3: Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4: RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
// =============================================================================

use super::IndicatorResult;

/// Compute the full RSI series for the given `closes` and `period`.
///
/// The window begins at index `period` (the first `period` deltas seed the
/// averages).
///
/// # Edge cases
/// - `period == 0` => empty result
/// - `closes.len() <= period` => empty result
/// - If average loss is zero (no down moves), RSI is exactly 100.0.
pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorResult {
    if period == 0 || closes.len() <= period {
        return IndicatorResult::empty();
    }

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = closes[..=period]
        .windows(2)
        .fold((0.0_f64, 0.0_f64), |(g, l), w| {
            let (gain, loss) = split_delta(w[1] - w[0]);
            (g + gain, l + loss)
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut result = Vec::with_capacity(closes.len() - period);
    result.push(rsi_from_averages(avg_gain, avg_loss));

    // --- Wilder's smoothing for subsequent values ----------------------------
    for w in closes[period..].windows(2) {
        let (gain, loss) = split_delta(w[1] - w[0]);
        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
        result.push(rsi_from_averages(avg_gain, avg_loss));
    }

    IndicatorResult::new(period, result)
}

// =============================================================================
// Internal helpers
// =============================================================================

fn split_delta(delta: f64) -> (f64, f64) {
    if delta > 0.0 {
        (delta, 0.0)
    } else {
        (0.0, -delta)
    }
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Zero average loss maps to 100.0, including the no-movement case.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes (period deltas).
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, 14).is_empty());
    }

    #[test]
    fn rsi_window_bounds() {
        let closes: Vec<f64> = (0..40).map(|x| (x as f64 * 0.7).sin() * 5.0 + 50.0).collect();
        let rsi = calculate_rsi(&closes, 14);
        assert_eq!(rsi.begin(), 14);
        assert_eq!(rsi.end(), 40);
        assert_eq!(rsi.len(), rsi.end() - rsi.begin());
    }

    #[test]
    fn rsi_all_gains() {
        // Strictly ascending prices => RSI should be exactly 100.
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(!series.is_empty());
        for &v in series.values() {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_all_losses() {
        // Strictly descending prices => RSI should be 0.
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(!series.is_empty());
        for &v in series.values() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_has_no_losses() {
        let closes = vec![100.0; 30];
        let series = calculate_rsi(&closes, 14);
        for &v in series.values() {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_hand_computed_first_value() {
        // period 3: deltas +2, -1, +1 => avg gain 1.0, avg loss 1/3.
        let closes = vec![10.0, 12.0, 11.0, 12.0, 11.0];
        let rsi = calculate_rsi(&closes, 3);
        assert_eq!(rsi.begin(), 3);
        assert!((rsi.values()[0] - 75.0).abs() < 1e-10);
        // Next delta -1: gain 2/3, loss (2/3 + 1)/3 = 5/9 => RS = 6/5.
        let expected = 100.0 - 100.0 / (1.0 + 6.0 / 5.0);
        assert!((rsi.values()[1] - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 4);
        for &v in series.values() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }
}
