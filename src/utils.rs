pub mod deduplication;

use crate::constants::DATA_DIR_ENV;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Get data root directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Per-instrument file name, optionally suffixed with a factor name
///
/// `AAPL` -> `AAPL.csv`, (`AAPL`, `RegLine10`) -> `AAPL_RegLine10.csv`
pub fn get_ticker_filename(folder: &Path, ticker: &str, factor: Option<&str>) -> PathBuf {
    match factor {
        Some(factor) => folder.join(format!("{}_{}.csv", ticker, factor)),
        None => folder.join(format!("{}.csv", ticker)),
    }
}

/// Parse a date in `YYYYMMDD` or `YYYY-MM-DD` form
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|e| Error::Parse(format!("Invalid date '{}': {}", s, e)))
}

/// Parse an index cell (supports multiple formats)
///
/// Date-only values land on midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    const DATETIME_FORMATS: [&str; 3] = ["%Y%m%d %H%M%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    for format in DATETIME_FORMATS {
        if let Ok(time) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(time);
        }
    }

    parse_date(s)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| Error::Parse(format!("Invalid timestamp '{}'", s)))
}

/// Missing values are written as empty cells
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Empty cells read back as NaN
pub fn parse_value(s: &str) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .map_err(|e| Error::Parse(format!("Invalid number '{}': {}", s, e)))
}

/// Write a CSV file atomically (write to temp, then rename)
///
/// The target is only replaced once the temp file is fully written and
/// synced; on failure the temp file is removed and the old file is untouched.
pub fn write_csv_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
    }

    let temp_path = temp_path_for(path);
    let result = write_temp(&temp_path, write).and_then(|_| {
        fs::rename(&temp_path, path)
            .map_err(|e| Error::Io(format!("Failed to replace {}: {}", path.display(), e)))
    });

    if result.is_err() {
        // Clean up temp file
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp<F>(temp_path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<File>) -> Result<()>,
{
    let mut writer = csv::Writer::from_path(temp_path)
        .map_err(|e| Error::Io(format!("Failed to create {}: {}", temp_path.display(), e)))?;
    write(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::Io(format!("Failed to flush {}: {}", temp_path.display(), e)))?;
    file.sync_all()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ticker_filename() {
        let folder = Path::new("factor");
        assert_eq!(get_ticker_filename(folder, "AAPL", None), folder.join("AAPL.csv"));
        assert_eq!(
            get_ticker_filename(folder, "AAPL", Some("BBMean")),
            folder.join("AAPL_BBMean.csv")
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let minute = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(9, 31, 0).unwrap();
        let midnight = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();

        assert_eq!(parse_timestamp("20170301 093100").unwrap(), minute);
        assert_eq!(parse_timestamp("2017-03-01 09:31:00").unwrap(), minute);
        assert_eq!(parse_timestamp("20170301").unwrap(), midnight);
        assert_eq!(parse_timestamp("2017-03-01").unwrap(), midnight);
        assert!(parse_timestamp("March 1st").is_err());
    }

    #[test]
    fn test_value_round_trip() {
        assert_eq!(format_value(f64::NAN), "");
        assert!(parse_value("").unwrap().is_nan());
        assert_eq!(parse_value(&format_value(1.25)).unwrap(), 1.25);
        assert!(parse_value("abc").is_err());
    }

    #[test]
    fn test_write_csv_atomic_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("AAPL.csv");

        write_csv_atomic(&path, |w| {
            w.write_record(["Date", "Close"])?;
            Ok(())
        })
        .unwrap();
        write_csv_atomic(&path, |w| {
            w.write_record(["Date", "Close"])?;
            w.write_record(["20170301", "1"])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,Close\n20170301,1\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_write_csv_atomic_keeps_old_file_on_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("AAPL.csv");
        fs::write(&path, "Date,Close\n20170301,1\n").unwrap();

        let result = write_csv_atomic(&path, |w| {
            w.write_record(["Date", "Close"])?;
            Err(Error::Computation("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,Close\n20170301,1\n");
        assert!(!temp_path_for(&path).exists());
    }
}
