use crate::constants::{BOLLINGER_WIDTHS, REGRESSION_WINDOWS};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One factor row: a timestamp and one value per column
#[derive(Debug, Clone, PartialEq)]
pub struct FactorRow {
    pub time: NaiveDateTime,
    pub values: Vec<f64>,
}

/// Append-only factor table keyed by timestamp
///
/// Rows are strictly increasing in time. The last row's timestamp is the
/// watermark from which the next run resumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSeries {
    columns: Vec<String>,
    rows: Vec<FactorRow>,
}

impl FactorSeries {
    /// Empty series with the given columns
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FactorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last processed timestamp
    pub fn watermark(&self) -> Option<NaiveDateTime> {
        self.rows.last().map(|r| r.time)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row past the watermark
    pub fn push(&mut self, time: NaiveDateTime, values: Vec<f64>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} factor values, got {}",
                self.columns.len(),
                values.len()
            )));
        }
        if let Some(watermark) = self.watermark() {
            if time <= watermark {
                return Err(Error::InvalidInput(format!(
                    "Factor row {} is not after watermark {}",
                    time, watermark
                )));
            }
        }

        self.rows.push(FactorRow { time, values });
        Ok(())
    }

    /// Append a row of NaN to be filled in later
    pub fn push_empty(&mut self, time: NaiveDateTime) -> Result<()> {
        let values = vec![f64::NAN; self.columns.len()];
        self.push(time, values)
    }

    /// Overwrite one cell of an existing row
    pub fn set(&mut self, time: &NaiveDateTime, column: &str, value: f64) -> Result<()> {
        let col = self
            .column_index(column)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown factor column: {}", column)))?;
        let row = self
            .rows
            .binary_search_by(|r| r.time.cmp(time))
            .map_err(|_| Error::InvalidInput(format!("No factor row for {}", time)))?;

        self.rows[row].values[col] = value;
        Ok(())
    }

    /// Value of one cell, if the row exists
    pub fn get(&self, time: &NaiveDateTime, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        let row = self.rows.binary_search_by(|r| r.time.cmp(time)).ok()?;
        Some(self.rows[row].values[col])
    }
}

/// Intraday factor columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntradayFactor {
    RegLine10,
    RegLine30,
    RegLine90,
    RegLine270,
    BB1Up,
    BB1Down,
    BB2Up,
    BB2Down,
    BB3Up,
    BB3Down,
    BBMean,
}

impl IntradayFactor {
    /// Column / file-suffix name
    pub fn name(&self) -> &'static str {
        match self {
            IntradayFactor::RegLine10 => "RegLine10",
            IntradayFactor::RegLine30 => "RegLine30",
            IntradayFactor::RegLine90 => "RegLine90",
            IntradayFactor::RegLine270 => "RegLine270",
            IntradayFactor::BB1Up => "BB1Up",
            IntradayFactor::BB1Down => "BB1Down",
            IntradayFactor::BB2Up => "BB2Up",
            IntradayFactor::BB2Down => "BB2Down",
            IntradayFactor::BB3Up => "BB3Up",
            IntradayFactor::BB3Down => "BB3Down",
            IntradayFactor::BBMean => "BBMean",
        }
    }

    /// Trailing window of a regression projection
    pub fn regression_window(&self) -> Option<usize> {
        match self {
            IntradayFactor::RegLine10 => Some(REGRESSION_WINDOWS[0]),
            IntradayFactor::RegLine30 => Some(REGRESSION_WINDOWS[1]),
            IntradayFactor::RegLine90 => Some(REGRESSION_WINDOWS[2]),
            IntradayFactor::RegLine270 => Some(REGRESSION_WINDOWS[3]),
            _ => None,
        }
    }

    /// Signed band multiplier: `mean + k * std` (0 for the mean itself)
    pub fn band_multiplier(&self) -> Option<f64> {
        match self {
            IntradayFactor::BB1Up => Some(BOLLINGER_WIDTHS[0]),
            IntradayFactor::BB1Down => Some(-BOLLINGER_WIDTHS[0]),
            IntradayFactor::BB2Up => Some(BOLLINGER_WIDTHS[1]),
            IntradayFactor::BB2Down => Some(-BOLLINGER_WIDTHS[1]),
            IntradayFactor::BB3Up => Some(BOLLINGER_WIDTHS[2]),
            IntradayFactor::BB3Down => Some(-BOLLINGER_WIDTHS[2]),
            IntradayFactor::BBMean => Some(0.0),
            _ => None,
        }
    }

    pub fn all() -> Vec<IntradayFactor> {
        vec![
            IntradayFactor::RegLine10,
            IntradayFactor::RegLine30,
            IntradayFactor::RegLine90,
            IntradayFactor::RegLine270,
            IntradayFactor::BB1Up,
            IntradayFactor::BB1Down,
            IntradayFactor::BB2Up,
            IntradayFactor::BB2Down,
            IntradayFactor::BB3Up,
            IntradayFactor::BB3Down,
            IntradayFactor::BBMean,
        ]
    }
}

impl fmt::Display for IntradayFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Factor columns persisted together in one file, sharing one watermark
#[derive(Debug, Clone, PartialEq)]
pub struct FactorGroup {
    /// File suffix; `None` writes `<TICKER>.csv`
    pub suffix: Option<String>,
    pub factors: Vec<IntradayFactor>,
}

impl FactorGroup {
    /// Name used in logs and lookups
    pub fn key(&self) -> &str {
        self.suffix.as_deref().unwrap_or("combined")
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.factors.iter().map(|f| f.name()).collect()
    }
}

/// How intraday factors are laid out on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FactorMode {
    /// One file per factor: `<TICKER>_<Factor>.csv`
    #[default]
    Split,
    /// All factors in `<TICKER>.csv`
    Combined,
}

impl FactorMode {
    pub fn groups(&self) -> Vec<FactorGroup> {
        match self {
            FactorMode::Split => IntradayFactor::all()
                .into_iter()
                .map(|factor| FactorGroup {
                    suffix: Some(factor.name().to_string()),
                    factors: vec![factor],
                })
                .collect(),
            FactorMode::Combined => vec![FactorGroup {
                suffix: None,
                factors: IntradayFactor::all(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_push_enforces_watermark() {
        let mut series = FactorSeries::new(&["AvgRange", "FrogBox"]);
        assert_eq!(series.watermark(), None);

        series.push(day(2), vec![1.0, 2.0]).unwrap();
        assert_eq!(series.watermark(), Some(day(2)));

        assert!(series.push(day(2), vec![1.0, 2.0]).is_err());
        assert!(series.push(day(1), vec![1.0, 2.0]).is_err());
        assert!(series.push(day(3), vec![1.0]).is_err());
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_push_empty_then_set() {
        let mut series = FactorSeries::new(&["AvgRange", "FrogBox"]);
        series.push_empty(day(1)).unwrap();
        assert!(series.get(&day(1), "AvgRange").unwrap().is_nan());

        series.set(&day(1), "FrogBox", 0.5).unwrap();
        assert_eq!(series.get(&day(1), "FrogBox"), Some(0.5));
        assert!(series.set(&day(2), "FrogBox", 0.5).is_err());
        assert!(series.set(&day(1), "Unknown", 0.5).is_err());
    }

    #[test]
    fn test_factor_modes() {
        let split = FactorMode::Split.groups();
        assert_eq!(split.len(), 11);
        assert_eq!(split[0].key(), "RegLine10");
        assert_eq!(split[0].column_names(), vec!["RegLine10"]);

        let combined = FactorMode::Combined.groups();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].key(), "combined");
        assert_eq!(combined[0].factors.len(), 11);
        assert_eq!(FactorMode::default(), FactorMode::Split);
    }

    #[test]
    fn test_factor_kinds() {
        for factor in IntradayFactor::all() {
            assert!(factor.regression_window().is_some() != factor.band_multiplier().is_some());
        }
        assert_eq!(IntradayFactor::BB2Down.band_multiplier(), Some(-2.0));
        assert_eq!(IntradayFactor::RegLine90.regression_window(), Some(90));

        let windows: Vec<usize> = IntradayFactor::all().iter().filter_map(|f| f.regression_window()).collect();
        assert_eq!(windows, REGRESSION_WINDOWS);
    }
}
