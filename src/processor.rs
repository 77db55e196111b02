// =============================================================================
// Symbol Processor: one input file from load to enriched output
// =============================================================================
//
//   Created ──load──► Loaded ──enrich──► Enriched ──write──► Written ──► Done
//                        │
//                        └── zero candles / any file-level error ──► Failed
//
// A processor owns its series and derived columns outright; nothing it
// touches is visible to another processor, which is what lets the pool run
// them side by side without locks.
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SymbolError;
use crate::indicators::IndicatorBackend;
use crate::market_data::{write_series, CandleReader, CandleSeries, ParseReport, PriceColumns};

/// Where a processor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Created,
    Loaded,
    Enriched,
    Written,
    Done,
    Failed,
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Loaded => "Loaded",
            Self::Enriched => "Enriched",
            Self::Written => "Written",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub output: PathBuf,
    pub rows: usize,
    pub skipped_rows: usize,
    /// Indicators skipped because an input column was absent.
    pub skipped_indicators: Vec<&'static str>,
}

pub struct SymbolProcessor {
    input: PathBuf,
    output_dir: PathBuf,
    backend: Arc<IndicatorBackend>,
    state: ProcessorState,
}

impl SymbolProcessor {
    pub fn new(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        backend: Arc<IndicatorBackend>,
    ) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            backend,
            state: ProcessorState::Created,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Symbol name, taken from the input file stem.
    pub fn symbol(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Output file: the input file name placed under the output directory.
    pub fn output_path(&self) -> PathBuf {
        match self.input.file_name() {
            Some(name) => self.output_dir.join(name),
            None => self.output_dir.join(self.symbol()),
        }
    }

    /// Drive the state machine to `Done`, or to `Failed` on the first
    /// file-level error.
    pub fn run(&mut self) -> Result<SymbolSummary, SymbolError> {
        let result = self.run_steps();
        if result.is_err() {
            self.state = ProcessorState::Failed;
        }
        result
    }

    fn run_steps(&mut self) -> Result<SymbolSummary, SymbolError> {
        info!(symbol = %self.symbol(), path = %self.input.display(), "processing file");

        let (mut series, report) = self.load()?;
        self.state = ProcessorState::Loaded;
        if series.is_empty() {
            return Err(SymbolError::EmptySeries {
                path: self.input.clone(),
            });
        }

        let skipped_indicators = self.enrich(&mut series)?;
        self.state = ProcessorState::Enriched;

        let output = self.output_path();
        write_series(&series, &self.backend.output_fields(), &output)?;
        self.state = ProcessorState::Written;

        let summary = SymbolSummary {
            symbol: series.symbol().to_string(),
            output,
            rows: series.len(),
            skipped_rows: report.skipped.len(),
            skipped_indicators,
        };
        drop(series);
        self.state = ProcessorState::Done;

        info!(
            symbol = %summary.symbol,
            rows = summary.rows,
            skipped_rows = summary.skipped_rows,
            output = %summary.output.display(),
            "file written"
        );
        Ok(summary)
    }

    fn load(&self) -> Result<(CandleSeries, ParseReport), SymbolError> {
        let reader = CandleReader::open(&self.input)?;
        let mut series = CandleSeries::with_columns(self.symbol(), &reader.columns().present());
        let report = series.load(reader.into_rows());
        info!(
            symbol = %series.symbol(),
            candles = report.loaded,
            skipped = report.skipped.len(),
            "loaded candles"
        );
        Ok((series, report))
    }

    /// Run every enabled indicator once over the full series and merge the
    /// results. Returns the indicators that could not run.
    fn enrich(&self, series: &mut CandleSeries) -> Result<Vec<&'static str>, SymbolError> {
        let columns = PriceColumns::from_series(series);
        self.backend.begin_series();

        let mut skipped = Vec::new();
        for &indicator in self.backend.enabled() {
            if let Some(missing) = indicator.inputs().iter().find(|f| !series.has_column(**f)) {
                info!(
                    symbol = %series.symbol(),
                    indicator = %indicator,
                    missing = %missing,
                    "input column absent, indicator skipped"
                );
                skipped.push(indicator.name());
                continue;
            }

            let output = self.backend.compute(indicator, &columns);
            if output.is_empty() {
                debug!(
                    symbol = %series.symbol(),
                    indicator = %indicator,
                    candles = series.len(),
                    "series shorter than lookback, nothing to merge"
                );
                continue;
            }
            for (field, values) in &output.columns {
                series.apply(*field, output.begin, output.end, values)?;
            }
        }
        Ok(skipped)
    }
}
