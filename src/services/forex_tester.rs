//! Export intraday price files in the ForexTester import layout

use crate::error::Result;
use crate::models::Frequency;
use crate::services::price_store::PriceStore;
use crate::utils::{format_value, get_ticker_filename, write_csv_atomic};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

const HEADER: [&str; 8] = [
    "<TICKER>",
    "<DTYYYYMMDD>",
    "<TIME>",
    "<OPEN>",
    "<HIGH>",
    "<LOW>",
    "<CLOSE>",
    "<VOL>",
];

/// Convert `<input_dir>/<TICKER>.csv` into `<output_dir>/<TICKER>.csv`
///
/// Only bars dated on or after `start_date` are written. Returns the row count.
pub fn export(input_dir: &Path, output_dir: &Path, ticker: &str, start_date: NaiveDate) -> Result<usize> {
    let store = PriceStore::new(input_dir, Frequency::Intraday);
    let prices = store.load(ticker)?;

    let bars: Vec<_> = prices
        .bars()
        .iter()
        .filter(|bar| bar.time.date() >= start_date)
        .collect();

    let output = get_ticker_filename(output_dir, ticker, None);
    write_csv_atomic(&output, |writer| {
        writer.write_record(HEADER)?;
        for bar in &bars {
            writer.write_record([
                ticker.to_string(),
                bar.time.format("%Y%m%d").to_string(),
                bar.time.format("%H%M%S").to_string(),
                format_value(bar.open),
                format_value(bar.high),
                format_value(bar.low),
                format_value(bar.close),
                format_value(bar.volume.unwrap_or(0.0)),
            ])?;
        }
        Ok(())
    })?;

    info!(ticker = %ticker, rows = bars.len(), path = %output.display(), "Wrote ForexTester file");
    Ok(bars.len())
}
