use crate::constants::{DATETIME_FORMAT, DATE_FORMAT};
use chrono::{NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequency of a price or factor file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One bar per trading day, indexed `YYYYMMDD`
    #[default]
    Daily,
    /// Minute bars, indexed `YYYYMMDD HHMMSS`
    Intraday,
}

impl Frequency {
    /// strftime pattern of the index column
    pub fn index_format(&self) -> &'static str {
        match self {
            Frequency::Daily => DATE_FORMAT,
            Frequency::Intraday => DATETIME_FORMAT,
        }
    }

    /// Format a timestamp for the index column
    pub fn format_time(&self, time: &NaiveDateTime) -> String {
        time.format(self.index_format()).to_string()
    }

    /// Key two bars must share to be considered the same observation
    pub fn dedup_key(&self, time: &NaiveDateTime) -> NaiveDateTime {
        match self {
            Frequency::Daily => time.date().and_time(NaiveTime::MIN),
            Frequency::Intraday => *time,
        }
    }

    /// Interval parameter of the chart API
    pub fn to_chart_interval(&self) -> &'static str {
        match self {
            Frequency::Daily => "1d",
            Frequency::Intraday => "1m",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Intraday => write!(f, "intraday"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_default_is_daily() {
        assert_eq!(Frequency::default(), Frequency::Daily);
    }

    #[test]
    fn test_format_time() {
        let t = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(9, 31, 5).unwrap();
        assert_eq!(Frequency::Daily.format_time(&t), "20170301");
        assert_eq!(Frequency::Intraday.format_time(&t), "20170301 093105");
    }

    #[test]
    fn test_dedup_key() {
        let morning = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap();
        let afternoon = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(15, 0, 0).unwrap();

        assert_eq!(Frequency::Daily.dedup_key(&morning), Frequency::Daily.dedup_key(&afternoon));
        assert_ne!(
            Frequency::Intraday.dedup_key(&morning),
            Frequency::Intraday.dedup_key(&afternoon)
        );
    }
}
