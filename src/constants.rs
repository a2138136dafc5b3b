//! Shared constants for price storage and factor computation

/// Bars required before the daily range factors are defined
pub const DAILY_LOOKBACK: usize = 30;

/// Samples re-materialized ahead of the first unseen intraday timestamp.
/// Must be at least the widest rolling window below.
pub const INTRADAY_LOOKBACK: usize = 270;

/// Trailing window for the Bollinger mean/std
pub const BOLLINGER_WINDOW: usize = 30;

/// Band multipliers, in column order (BB1, BB2, BB3)
pub const BOLLINGER_WIDTHS: [f64; 3] = [1.0, 2.0, 3.0];

/// Trailing windows for the one-step-ahead regression projections
pub const REGRESSION_WINDOWS: [usize; 4] = [10, 30, 90, 270];

/// Index format for daily files
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Index format for intraday files
pub const DATETIME_FORMAT: &str = "%Y%m%d %H%M%S";

/// Header of the index column in every CSV we write
pub const INDEX_HEADER: &str = "Date";

/// Daily factor columns
pub const AVG_RANGE: &str = "AvgRange";
pub const FROG_BOX: &str = "FrogBox";

/// Fallback exchange timezone when the data source does not report one
pub const DEFAULT_EXCHANGE_TZ: &str = "US/Eastern";

/// Environment variable overriding the data root
pub const DATA_DIR_ENV: &str = "PRICEFACTOR_DATA_DIR";

/// Calendar days of minute history the chart API serves, counted back from today
pub const INTRADAY_HISTORY_DAYS: i64 = 29;

/// Longest span of minute bars one chart request may cover
pub const INTRADAY_CHUNK_DAYS: i64 = 7;
