use crate::constants::INDEX_HEADER;
use crate::error::{Error, Result};
use crate::models::{FactorSeries, Frequency};
use crate::utils::{format_value, parse_timestamp, parse_value, write_csv_atomic};
use std::path::Path;
use tracing::debug;

/// Load a factor file, or an empty series with `columns` if it does not exist
///
/// Columns are matched by header name, so a file written with a different
/// column order still loads into the expected layout.
pub fn load_factor_csv(path: &Path, columns: &[&str]) -> Result<FactorSeries> {
    let mut series = FactorSeries::new(columns);
    if !path.exists() {
        debug!(path = %path.display(), "No factor file yet, starting empty");
        return Ok(series);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader.headers()?.clone();
    let indices = columns
        .iter()
        .map(|name| {
            headers.iter().position(|h| h.trim() == *name).ok_or_else(|| {
                Error::Parse(format!("Missing factor column '{}' in {}", name, path.display()))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    for result in reader.records() {
        let record = result.map_err(|e| {
            Error::Parse(format!("CSV parse error in {}: {}", path.display(), e))
        })?;

        let time = parse_timestamp(record.get(0).unwrap_or(""))?;
        let values = indices
            .iter()
            .map(|&idx| parse_value(record.get(idx).unwrap_or("")))
            .collect::<Result<Vec<f64>>>()?;

        series.push(time, values).map_err(|e| {
            Error::Parse(format!("Corrupt factor file {}: {}", path.display(), e))
        })?;
    }

    debug!(path = %path.display(), rows = series.len(), "Loaded factor file");
    Ok(series)
}

/// Overwrite a factor file with the whole series, atomically
pub fn save_factor_csv(path: &Path, series: &FactorSeries, frequency: Frequency) -> Result<()> {
    write_csv_atomic(path, |writer| {
        let mut header = vec![INDEX_HEADER.to_string()];
        header.extend(series.columns().iter().cloned());
        writer.write_record(&header)?;

        for row in series.rows() {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(frequency.format_time(&row.time));
            record.extend(row.values.iter().map(|v| format_value(*v)));
            writer.write_record(&record)?;
        }
        Ok(())
    })?;

    debug!(path = %path.display(), rows = series.len(), "Saved factor file");
    Ok(())
}
