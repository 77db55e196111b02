// =============================================================================
// CSV input / output for candle series
// =============================================================================
//
// Input headers are matched by name (case-insensitive, any order, extra
// columns ignored). `event_time` and `close` are mandatory; the other price
// columns may be absent. Output is written to a `.tmp` sibling and renamed
// into place so a failed task never leaves a truncated file behind.
// =============================================================================

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::candle::{CandleSeries, PriceField, RawRow};
use super::IndicatorField;
use crate::error::{ParseError, SymbolError};

pub const EVENT_TIME: &str = "event_time";

/// Header positions of the columns we read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    event_time: usize,
    prices: [(PriceField, Option<usize>); 5],
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, SymbolError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
            .collect();
        let position = |name: &str| names.iter().position(|h| h == name);

        let event_time = position(EVENT_TIME).ok_or_else(|| SymbolError::MissingColumn {
            path: path.to_path_buf(),
            column: EVENT_TIME,
        })?;
        let prices = PriceField::ALL.map(|field| (field, position(field.name())));

        if position(PriceField::Close.name()).is_none() {
            return Err(SymbolError::MissingColumn {
                path: path.to_path_buf(),
                column: PriceField::Close.name(),
            });
        }

        Ok(Self { event_time, prices })
    }

    /// Price columns present in the header.
    pub fn present(&self) -> Vec<PriceField> {
        self.prices
            .iter()
            .filter_map(|(field, idx)| idx.map(|_| *field))
            .collect()
    }

    fn to_raw(&self, line: u64, record: &csv::StringRecord) -> Result<RawRow, ParseError> {
        let event_time = record
            .get(self.event_time)
            .ok_or(ParseError::MissingField {
                line,
                column: EVENT_TIME,
            })?
            .to_string();

        let mut row = RawRow {
            line,
            event_time,
            ..RawRow::default()
        };
        for (field, idx) in &self.prices {
            if let Some(idx) = idx {
                let value = record.get(*idx).ok_or(ParseError::MissingField {
                    line,
                    column: field.name(),
                })?;
                row.set_price(*field, value);
            }
        }
        Ok(row)
    }
}

/// Streaming reader over one candle file.
pub struct CandleReader {
    reader: csv::Reader<File>,
    columns: ColumnMap,
}

impl CandleReader {
    /// Open `path` and resolve its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SymbolError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| SymbolError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        let headers = reader.headers().map_err(|source| SymbolError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let columns = ColumnMap::from_headers(headers, path)?;
        debug!(path = %path.display(), columns = ?columns.present(), "header resolved");

        Ok(Self { reader, columns })
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Consume the reader, yielding one mapped row (or row error) per record.
    pub fn into_rows(self) -> impl Iterator<Item = Result<RawRow, ParseError>> {
        let columns = self.columns;
        self.reader.into_records().map(move |record| match record {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                columns.to_raw(line, &record)
            }
            Err(err) => Err(ParseError::Malformed {
                line: err.position().map_or(0, |p| p.line()),
                reason: err.to_string(),
            }),
        })
    }
}

/// Format one numeric field; unset or `NaN` values become empty.
fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

/// Serialise `series` with the given indicator columns to `path`.
pub fn write_series(
    series: &CandleSeries,
    indicator_fields: &[IndicatorField],
    path: impl AsRef<Path>,
) -> Result<(), SymbolError> {
    let path = path.as_ref();
    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = write_rows(series, indicator_fields, &tmp_path).and_then(|()| {
        std::fs::rename(&tmp_path, path).map_err(|source| SymbolError::Io {
            path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&tmp_path) {
            warn!(path = %tmp_path.display(), error = %e, "could not remove partial output");
        }
    }
    result
}

fn write_rows(
    series: &CandleSeries,
    indicator_fields: &[IndicatorField],
    path: &Path,
) -> Result<(), SymbolError> {
    let csv_err = |source: csv::Error| SymbolError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let header: Vec<&str> = std::iter::once(EVENT_TIME)
        .chain(PriceField::ALL.iter().map(|f| f.name()))
        .chain(indicator_fields.iter().map(|f| f.name()))
        .collect();
    writer.write_record(&header).map_err(csv_err)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for candle in series.candles() {
        record.clear();
        record.push(candle.event_time_text.clone());
        for field in PriceField::ALL {
            let value = series.has_column(field).then(|| candle.price(field));
            record.push(format_value(value));
        }
        for field in indicator_fields {
            record.push(format_value(candle.indicators.get(*field)));
        }
        writer.write_record(&record).map_err(csv_err)?;
    }

    writer.flush().map_err(|source| SymbolError::Io {
        path: path.to_path_buf(),
        source,
    })
}
