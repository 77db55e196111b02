// =============================================================================
// Error taxonomy
// =============================================================================
//
// Row-level errors are recoverable (the row is skipped), file-level errors
// fail one symbol, process-level errors abort the run before any work is
// scheduled.
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::market_data::IndicatorField;

/// A single input row could not be turned into a candle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: field `{column}` is not a number: {value:?}")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: field `{column}` is not a timestamp: {value:?}")]
    InvalidTimestamp { line: u64, value: String, column: &'static str },

    #[error("line {line}: field `{column}` is missing")]
    MissingField { line: u64, column: &'static str },

    #[error("line {line}: malformed record: {reason}")]
    Malformed { line: u64, reason: String },
}

impl ParseError {
    pub fn line(&self) -> u64 {
        match self {
            Self::InvalidNumber { line, .. }
            | Self::InvalidTimestamp { line, .. }
            | Self::MissingField { line, .. }
            | Self::Malformed { line, .. } => *line,
        }
    }
}

/// An indicator merge addressed candles outside the series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {field} to [{begin}, {end}) with {values} values on a series of {len}")]
pub struct RangeError {
    pub field: IndicatorField,
    pub begin: usize,
    pub end: usize,
    pub values: usize,
    pub len: usize,
}

/// Failure that ends processing of one input file.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("no valid candles in {path}")]
    EmptySeries { path: PathBuf },

    #[error("{path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The indicator backend refused its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitializationError {
    #[error("{name} period must be greater than zero")]
    ZeroPeriod { name: &'static str },

    #[error("{name}: fast period {fast} must be smaller than slow period {slow}")]
    FastNotBelowSlow {
        name: &'static str,
        fast: usize,
        slow: usize,
    },

    #[error("bollinger deviation multipliers must be finite and non-negative")]
    InvalidDeviation,

    #[error("no indicators enabled")]
    NothingEnabled,
}

/// Command-line arguments that cannot start a run.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("missing arguments, input_folder and/or output_folder")]
    Missing,

    #[error("{which} folder does not exist: {path}")]
    NotFound { which: &'static str, path: PathBuf },

    #[error("{which} path is not a directory: {path}")]
    NotADirectory { which: &'static str, path: PathBuf },

    #[error("input and output folder are the same: {path}")]
    SameDirectory { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_line() {
        let err = ParseError::InvalidNumber {
            line: 7,
            column: "close",
            value: "abc".into(),
        };
        assert_eq!(err.line(), 7);
        assert!(err.to_string().contains("close"));
    }

    #[test]
    fn range_error_message_names_field() {
        let err = RangeError {
            field: IndicatorField::Rsi,
            begin: 3,
            end: 12,
            values: 9,
            len: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("rsi"), "{msg}");
        assert!(msg.contains("[3, 12)"), "{msg}");
    }
}
