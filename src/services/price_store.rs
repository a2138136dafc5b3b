//! Per-instrument price files
//!
//! One CSV per ticker, `<dir>/<TICKER>.csv`, with the index in the first
//! column and `Open,High,Low,Close` (plus `Volume` when known). Files are
//! always rewritten whole, atomically.

use crate::constants::INDEX_HEADER;
use crate::error::{Error, Result};
use crate::models::{Bar, Frequency, PriceSeries};
use crate::utils::{format_value, get_ticker_filename, parse_timestamp, parse_value, write_csv_atomic};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Folder of price files at one frequency
#[derive(Debug, Clone)]
pub struct PriceStore {
    dir: PathBuf,
    frequency: Frequency,
}

impl PriceStore {
    pub fn new<P: Into<PathBuf>>(dir: P, frequency: Frequency) -> Self {
        Self {
            dir: dir.into(),
            frequency,
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn path(&self, ticker: &str) -> PathBuf {
        get_ticker_filename(&self.dir, ticker, None)
    }

    /// Load a ticker's full history; a missing file is `MissingInputFile`
    pub fn load(&self, ticker: &str) -> Result<PriceSeries> {
        read_price_csv(&self.path(ticker), self.frequency)
    }

    /// Load a ticker's full history, or an empty series if nothing is stored yet
    pub fn load_or_empty(&self, ticker: &str) -> Result<PriceSeries> {
        match self.load(ticker) {
            Err(Error::MissingInputFile(_)) => Ok(PriceSeries::new()),
            other => other,
        }
    }

    /// Overwrite a ticker's file with the whole series
    pub fn save(&self, ticker: &str, series: &PriceSeries) -> Result<()> {
        write_price_csv(&self.path(ticker), series, self.frequency)
    }
}

/// Replace the tail of `existing` from `cutover` on with `new`
///
/// Existing rows at or after `cutover` are dropped; the result is sorted and
/// unique per timestamp, fetched rows winning over stored ones.
pub fn merge(
    existing: &PriceSeries,
    new: Vec<Bar>,
    cutover: NaiveDateTime,
    frequency: Frequency,
) -> PriceSeries {
    let mut merged: Vec<Bar> = existing
        .bars()
        .iter()
        .filter(|b| b.time < cutover)
        .cloned()
        .collect();

    merged.extend(new);
    PriceSeries::from_bars(merged, frequency)
}

/// Narrow a requested fetch window against what is already stored
///
/// When the store already reaches past `requested_end`, the end is extended
/// to the last stored date. Otherwise the start moves to the day after the
/// last stored date, so already stored days are never fetched again. An
/// empty store keeps the request as is. The result may have start > end,
/// meaning there is nothing to fetch.
pub fn compute_request_window(
    existing: &PriceSeries,
    requested_start: NaiveDate,
    requested_end: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let Some(last_date) = existing.last_time().map(|t| t.date()) else {
        return (requested_start, requested_end);
    };

    if last_date > requested_end {
        (requested_start, last_date)
    } else {
        (last_date + Duration::days(1), requested_end)
    }
}

/// Read a price CSV
///
/// Columns are located by header name (case-insensitive); unknown columns
/// such as `Adj Close` are ignored.
pub fn read_price_csv(path: &Path, frequency: Frequency) -> Result<PriceSeries> {
    if !path.exists() {
        return Err(Error::MissingInputFile(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let require = |name: &str| {
        find(name).ok_or_else(|| {
            Error::Parse(format!("Missing column '{}' in {}", name, path.display()))
        })
    };

    let open_idx = require("Open")?;
    let high_idx = require("High")?;
    let low_idx = require("Low")?;
    let close_idx = require("Close")?;
    let volume_idx = find("Volume");

    let mut bars = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            Error::Parse(format!("CSV parse error in {}: {}", path.display(), e))
        })?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let time = parse_timestamp(field(0))
            .map_err(|e| Error::Parse(format!("{} row {}: {}", path.display(), line + 1, e)))?;
        let mut bar = Bar::new(
            time,
            parse_value(field(open_idx))?,
            parse_value(field(high_idx))?,
            parse_value(field(low_idx))?,
            parse_value(field(close_idx))?,
        );
        if let Some(idx) = volume_idx {
            let volume = parse_value(field(idx))?;
            if !volume.is_nan() {
                bar.volume = Some(volume);
            }
        }
        bars.push(bar);
    }

    debug!(path = %path.display(), rows = bars.len(), "Loaded price file");
    Ok(PriceSeries::from_bars(bars, frequency))
}

/// Write a price CSV atomically
pub fn write_price_csv(path: &Path, series: &PriceSeries, frequency: Frequency) -> Result<()> {
    let with_volume = series.has_volume();

    write_csv_atomic(path, |writer| {
        let mut header = vec![INDEX_HEADER, "Open", "High", "Low", "Close"];
        if with_volume {
            header.push("Volume");
        }
        writer.write_record(&header)?;

        for bar in series.bars() {
            let mut record = vec![
                frequency.format_time(&bar.time),
                format_value(bar.open),
                format_value(bar.high),
                format_value(bar.low),
                format_value(bar.close),
            ];
            if with_volume {
                record.push(bar.volume.map_or(String::new(), format_value));
            }
            writer.write_record(&record)?;
        }
        Ok(())
    })?;

    debug!(path = %path.display(), rows = series.len(), "Saved price file");
    Ok(())
}
