// =============================================================================
// Indicator backend: validated parameters and the per-series dispatcher
// =============================================================================
//
// The backend is created once per run by `IndicatorBackend::init`, shared by
// reference with every worker, and consumed by `shutdown` after the pool has
// drained.  It holds no per-series state: workers only read its parameters
// and bump its counters.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::adosc::calculate_adosc;
use super::atr::calculate_atr;
use super::bollinger::calculate_bollinger;
use super::macd::calculate_macd;
use super::mfi::calculate_mfi;
use super::rsi::calculate_rsi;
use crate::error::InitializationError;
use crate::market_data::{IndicatorField, PriceColumns, PriceField};

// =============================================================================
// Indicator catalogue
// =============================================================================

/// The indicators attached to every series, in output-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Adosc,
    Atr,
    Bollinger,
    Macd,
    Mfi,
    Rsi,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Adosc,
        Indicator::Atr,
        Indicator::Bollinger,
        Indicator::Macd,
        Indicator::Mfi,
        Indicator::Rsi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Adosc => "adosc",
            Self::Atr => "atr",
            Self::Bollinger => "bollinger",
            Self::Macd => "macd",
            Self::Mfi => "mfi",
            Self::Rsi => "rsi",
        }
    }

    /// Output columns produced by this indicator.
    pub fn fields(self) -> &'static [IndicatorField] {
        match self {
            Self::Adosc => &[IndicatorField::Adosc],
            Self::Atr => &[IndicatorField::Atr],
            Self::Bollinger => &[
                IndicatorField::UpperBand,
                IndicatorField::MiddleBand,
                IndicatorField::LowerBand,
            ],
            Self::Macd => &[
                IndicatorField::Macd,
                IndicatorField::MacdSignal,
                IndicatorField::MacdHist,
            ],
            Self::Mfi => &[IndicatorField::Mfi],
            Self::Rsi => &[IndicatorField::Rsi],
        }
    }

    /// Price columns the indicator reads.
    pub fn inputs(self) -> &'static [PriceField] {
        use PriceField::*;
        match self {
            Self::Adosc | Self::Mfi => &[High, Low, Close, Volume],
            Self::Atr => &[High, Low, Close],
            Self::Bollinger | Self::Macd | Self::Rsi => &[Close],
        }
    }

    /// Index of the first defined output; a series of this length or
    /// shorter produces no values.
    pub fn lookback(self, params: &IndicatorParams) -> usize {
        match self {
            Self::Adosc => params.adosc_fast.max(params.adosc_slow).saturating_sub(1),
            Self::Atr => params.atr_period,
            Self::Bollinger => params.bollinger_period.saturating_sub(1),
            Self::Macd => {
                (params.macd_fast.max(params.macd_slow) + params.macd_signal).saturating_sub(2)
            }
            Self::Mfi => params.mfi_period,
            Self::Rsi => params.rsi_period,
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Parameters
// =============================================================================

fn default_period_14() -> usize {
    14
}

fn default_adosc_fast() -> usize {
    3
}

fn default_adosc_slow() -> usize {
    10
}

fn default_bollinger_period() -> usize {
    20
}

fn default_bollinger_dev() -> f64 {
    2.0
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

/// Look-back periods and multipliers for every indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_period_14")]
    pub mfi_period: usize,

    #[serde(default = "default_period_14")]
    pub atr_period: usize,

    #[serde(default = "default_adosc_fast")]
    pub adosc_fast: usize,

    #[serde(default = "default_adosc_slow")]
    pub adosc_slow: usize,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// Standard deviations above the middle band.
    #[serde(default = "default_bollinger_dev")]
    pub bollinger_dev_up: f64,

    /// Standard deviations below the middle band.
    #[serde(default = "default_bollinger_dev")]
    pub bollinger_dev_down: f64,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_period_14")]
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            mfi_period: default_period_14(),
            atr_period: default_period_14(),
            adosc_fast: default_adosc_fast(),
            adosc_slow: default_adosc_slow(),
            bollinger_period: default_bollinger_period(),
            bollinger_dev_up: default_bollinger_dev(),
            bollinger_dev_down: default_bollinger_dev(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            rsi_period: default_period_14(),
        }
    }
}

impl IndicatorParams {
    fn validate(&self) -> Result<(), InitializationError> {
        let periods = [
            ("mfi", self.mfi_period),
            ("atr", self.atr_period),
            ("adosc fast", self.adosc_fast),
            ("adosc slow", self.adosc_slow),
            ("bollinger", self.bollinger_period),
            ("macd fast", self.macd_fast),
            ("macd slow", self.macd_slow),
            ("macd signal", self.macd_signal),
            ("rsi", self.rsi_period),
        ];
        if let Some(&(name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(InitializationError::ZeroPeriod { name });
        }
        if self.adosc_fast >= self.adosc_slow {
            return Err(InitializationError::FastNotBelowSlow {
                name: "adosc",
                fast: self.adosc_fast,
                slow: self.adosc_slow,
            });
        }
        if self.macd_fast >= self.macd_slow {
            return Err(InitializationError::FastNotBelowSlow {
                name: "macd",
                fast: self.macd_fast,
                slow: self.macd_slow,
            });
        }
        let dev_ok = |d: f64| d.is_finite() && d >= 0.0;
        if !dev_ok(self.bollinger_dev_up) || !dev_ok(self.bollinger_dev_down) {
            return Err(InitializationError::InvalidDeviation);
        }
        Ok(())
    }
}

// =============================================================================
// Output
// =============================================================================

/// One indicator's result, split into output columns sharing one window.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    pub indicator: Indicator,
    pub begin: usize,
    pub end: usize,
    pub columns: Vec<(IndicatorField, Vec<f64>)>,
}

impl IndicatorOutput {
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Counters reported when the backend shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub series: u64,
    pub computations: u64,
    pub empty_results: u64,
}

/// Process-wide indicator handle: validated configuration plus counters.
#[derive(Debug)]
pub struct IndicatorBackend {
    params: IndicatorParams,
    enabled: Vec<Indicator>,
    series: AtomicU64,
    computations: AtomicU64,
    empty_results: AtomicU64,
}

impl IndicatorBackend {
    /// Validate the configuration and bring the backend up.
    ///
    /// `enabled` is normalised to the fixed column order with duplicates
    /// removed.
    pub fn init(
        enabled: &[Indicator],
        params: IndicatorParams,
    ) -> Result<Self, InitializationError> {
        params.validate()?;
        let enabled: Vec<Indicator> = Indicator::ALL
            .into_iter()
            .filter(|i| enabled.contains(i))
            .collect();
        if enabled.is_empty() {
            return Err(InitializationError::NothingEnabled);
        }

        info!(
            indicators = ?enabled.iter().map(|i| i.name()).collect::<Vec<_>>(),
            params = ?params,
            "indicator backend initialised"
        );

        Ok(Self {
            params,
            enabled,
            series: AtomicU64::new(0),
            computations: AtomicU64::new(0),
            empty_results: AtomicU64::new(0),
        })
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn enabled(&self) -> &[Indicator] {
        &self.enabled
    }

    /// Output columns of every enabled indicator, in order.
    pub fn output_fields(&self) -> Vec<IndicatorField> {
        self.enabled
            .iter()
            .flat_map(|i| i.fields().iter().copied())
            .collect()
    }

    /// Note the start of one series' enrichment.
    pub fn begin_series(&self) {
        self.series.fetch_add(1, Ordering::Relaxed);
    }

    /// Run one indicator over the full series.
    pub fn compute(&self, indicator: Indicator, cols: &PriceColumns) -> IndicatorOutput {
        let p = &self.params;
        let (begin, end, columns) = match indicator {
            Indicator::Adosc => {
                let r = calculate_adosc(
                    &cols.high,
                    &cols.low,
                    &cols.close,
                    &cols.volume,
                    p.adosc_fast,
                    p.adosc_slow,
                );
                (r.begin(), r.end(), vec![(IndicatorField::Adosc, r.into_values())])
            }
            Indicator::Atr => {
                let r = calculate_atr(&cols.high, &cols.low, &cols.close, p.atr_period);
                (r.begin(), r.end(), vec![(IndicatorField::Atr, r.into_values())])
            }
            Indicator::Bollinger => {
                let r = calculate_bollinger(
                    &cols.close,
                    p.bollinger_period,
                    p.bollinger_dev_up,
                    p.bollinger_dev_down,
                );
                (
                    r.begin(),
                    r.end(),
                    vec![
                        (IndicatorField::UpperBand, r.map(|b| b.upper).into_values()),
                        (IndicatorField::MiddleBand, r.map(|b| b.middle).into_values()),
                        (IndicatorField::LowerBand, r.map(|b| b.lower).into_values()),
                    ],
                )
            }
            Indicator::Macd => {
                let r = calculate_macd(&cols.close, p.macd_fast, p.macd_slow, p.macd_signal);
                (
                    r.begin(),
                    r.end(),
                    vec![
                        (IndicatorField::Macd, r.map(|m| m.macd).into_values()),
                        (IndicatorField::MacdSignal, r.map(|m| m.signal).into_values()),
                        (IndicatorField::MacdHist, r.map(|m| m.histogram).into_values()),
                    ],
                )
            }
            Indicator::Mfi => {
                let r = calculate_mfi(&cols.high, &cols.low, &cols.close, &cols.volume, p.mfi_period);
                (r.begin(), r.end(), vec![(IndicatorField::Mfi, r.into_values())])
            }
            Indicator::Rsi => {
                let r = calculate_rsi(&cols.close, p.rsi_period);
                (r.begin(), r.end(), vec![(IndicatorField::Rsi, r.into_values())])
            }
        };

        self.computations.fetch_add(1, Ordering::Relaxed);
        if begin == end {
            self.empty_results.fetch_add(1, Ordering::Relaxed);
        }
        debug!(indicator = %indicator, begin, end, len = cols.len(), "indicator computed");

        IndicatorOutput {
            indicator,
            begin,
            end,
            columns,
        }
    }

    pub fn stats(&self) -> BackendStats {
        BackendStats {
            series: self.series.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
        }
    }

    /// Tear the backend down once every worker has finished.
    pub fn shutdown(self) -> BackendStats {
        let stats = self.stats();
        info!(
            series = stats.series,
            computations = stats.computations,
            empty_results = stats.empty_results,
            "indicator backend shut down"
        );
        stats
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn columns(n: usize) -> PriceColumns {
        let close: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.45).sin() * 6.0 + i as f64 * 0.1)
            .collect();
        PriceColumns {
            open: close.iter().map(|c| c - 0.2).collect(),
            high: close.iter().map(|c| c + 1.1).collect(),
            low: close.iter().map(|c| c - 1.3).collect(),
            volume: (0..n).map(|i| 1_000.0 + (i % 5) as f64 * 120.0).collect(),
            close,
        }
    }

    fn backend() -> IndicatorBackend {
        IndicatorBackend::init(&Indicator::ALL, IndicatorParams::default()).unwrap()
    }

    #[test]
    fn default_params() {
        let p = IndicatorParams::default();
        assert_eq!(p.mfi_period, 14);
        assert_eq!((p.adosc_fast, p.adosc_slow), (3, 10));
        assert_eq!((p.macd_fast, p.macd_slow, p.macd_signal), (12, 26, 9));
        assert_eq!(p.bollinger_period, 20);
        assert!((p.bollinger_dev_up - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let p: IndicatorParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, IndicatorParams::default());
    }

    #[test]
    fn init_rejects_bad_params() {
        let zero = IndicatorParams {
            rsi_period: 0,
            ..IndicatorParams::default()
        };
        assert_eq!(
            IndicatorBackend::init(&Indicator::ALL, zero).unwrap_err(),
            InitializationError::ZeroPeriod { name: "rsi" }
        );

        let inverted = IndicatorParams {
            macd_fast: 30,
            ..IndicatorParams::default()
        };
        assert!(matches!(
            IndicatorBackend::init(&Indicator::ALL, inverted),
            Err(InitializationError::FastNotBelowSlow { name: "macd", .. })
        ));

        let dev = IndicatorParams {
            bollinger_dev_down: f64::NAN,
            ..IndicatorParams::default()
        };
        assert_eq!(
            IndicatorBackend::init(&Indicator::ALL, dev).unwrap_err(),
            InitializationError::InvalidDeviation
        );

        assert_eq!(
            IndicatorBackend::init(&[], IndicatorParams::default()).unwrap_err(),
            InitializationError::NothingEnabled
        );
    }

    #[test]
    fn enabled_set_is_normalised() {
        let b = IndicatorBackend::init(
            &[Indicator::Rsi, Indicator::Atr, Indicator::Rsi],
            IndicatorParams::default(),
        )
        .unwrap();
        assert_eq!(b.enabled(), &[Indicator::Atr, Indicator::Rsi]);
        assert_eq!(b.output_fields(), vec![IndicatorField::Atr, IndicatorField::Rsi]);
    }

    #[test]
    fn output_fields_in_fixed_order() {
        let names: Vec<&str> = backend().output_fields().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "adosc", "atr", "upper_band", "middle_band", "lower_band", "macd",
                "macd_signal", "macd_hist", "mfi", "rsi"
            ]
        );
    }

    #[test]
    fn every_indicator_respects_its_lookback() {
        let b = backend();
        for n in [0usize, 1, 5, 9, 10, 14, 15, 19, 20, 33, 34, 80] {
            let cols = columns(n);
            for ind in Indicator::ALL {
                let out = b.compute(ind, &cols);
                let lookback = ind.lookback(b.params());
                if n <= lookback {
                    assert!(out.is_empty(), "{ind} n={n} should be empty");
                } else {
                    assert_eq!(out.begin, lookback, "{ind} n={n}");
                    assert_eq!(out.end, n, "{ind} n={n}");
                }
                assert!(out.begin <= out.end && out.end <= n);
                assert_eq!(out.columns.len(), ind.fields().len());
                for (field, values) in &out.columns {
                    assert!(ind.fields().contains(field));
                    assert_eq!(values.len(), out.end - out.begin);
                }
            }
        }
    }

    #[test]
    fn default_lookbacks() {
        let p = IndicatorParams::default();
        assert_eq!(Indicator::Mfi.lookback(&p), 14);
        assert_eq!(Indicator::Atr.lookback(&p), 14);
        assert_eq!(Indicator::Rsi.lookback(&p), 14);
        assert_eq!(Indicator::Bollinger.lookback(&p), 19);
        assert_eq!(Indicator::Adosc.lookback(&p), 9);
        assert_eq!(Indicator::Macd.lookback(&p), 33);
    }

    #[test]
    fn counters_track_work() {
        let b = backend();
        b.begin_series();
        b.compute(Indicator::Rsi, &columns(5));
        b.compute(Indicator::Rsi, &columns(50));
        let stats = b.shutdown();
        assert_eq!(stats.series, 1);
        assert_eq!(stats.computations, 2);
        assert_eq!(stats.empty_results, 1);
    }

    #[test]
    fn indicator_serde_names() {
        let list: Vec<Indicator> = serde_json::from_str(r#"["mfi", "bollinger"]"#).unwrap();
        assert_eq!(list, vec![Indicator::Mfi, Indicator::Bollinger]);
    }
}
