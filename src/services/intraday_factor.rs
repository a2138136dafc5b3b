//! Intraday trend and band factors
//!
//! Each factor group (one file) carries its own watermark. For every group,
//! the unseen timestamps are computed over a raw window that starts up to
//! `INTRADAY_LOOKBACK` samples earlier, so rolling windows that straddle the
//! old/new boundary see the same history as a from-scratch build.

use crate::constants::{BOLLINGER_WINDOW, INTRADAY_LOOKBACK};
use crate::error::{Error, Result};
use crate::models::indicators::{rolling_regression, BollingerBands};
use crate::models::{Bar, FactorGroup, FactorMode, FactorSeries, Frequency, IntradayFactor, PriceSeries};
use crate::services::factor_store::{load_factor_csv, save_factor_csv};
use crate::services::price_store::PriceStore;
use crate::utils::get_ticker_filename;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lifecycle of one factor group within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStage {
    /// Read from disk; watermark recovered from the last row
    Loaded { watermark: Option<NaiveDateTime> },
    /// New rows appended in memory
    Extended { watermark: Option<NaiveDateTime> },
    /// Written back to disk
    Persisted { watermark: Option<NaiveDateTime> },
}

struct GroupState {
    group: FactorGroup,
    path: PathBuf,
    series: FactorSeries,
    stage: GroupStage,
}

/// Incremental builder of one ticker's intraday factor files
pub struct IntradayFactorEngine {
    ticker: String,
    prices: PriceSeries,
    groups: Vec<GroupState>,
    lookback: usize,
}

impl IntradayFactorEngine {
    /// Load the ticker's minute prices and every factor file of `mode`
    pub fn new(ticker: &str, factor_dir: &Path, price_dir: &Path, mode: FactorMode) -> Result<Self> {
        let prices = PriceStore::new(price_dir, Frequency::Intraday).load(ticker)?;
        Self::with_prices(ticker, prices, factor_dir, mode)
    }

    pub fn with_prices(
        ticker: &str,
        prices: PriceSeries,
        factor_dir: &Path,
        mode: FactorMode,
    ) -> Result<Self> {
        let groups = mode
            .groups()
            .into_iter()
            .map(|group| {
                let path = get_ticker_filename(factor_dir, ticker, group.suffix.as_deref());
                let series = load_factor_csv(&path, &group.column_names())?;
                let stage = GroupStage::Loaded {
                    watermark: series.watermark(),
                };
                Ok(GroupState {
                    group,
                    path,
                    series,
                    stage,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            ticker: ticker.to_string(),
            prices,
            groups,
            lookback: INTRADAY_LOOKBACK,
        })
    }

    /// Group keys in file order
    pub fn group_keys(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.group.key()).collect()
    }

    pub fn series(&self, key: &str) -> Option<&FactorSeries> {
        self.find(key).map(|g| &g.series)
    }

    pub fn stage(&self, key: &str) -> Option<GroupStage> {
        self.find(key).map(|g| g.stage)
    }

    pub fn watermark(&self, key: &str) -> Option<NaiveDateTime> {
        self.find(key).and_then(|g| g.series.watermark())
    }

    /// Timestamps the group has not processed yet
    ///
    /// An empty group covers the whole price history; values stay missing
    /// until the rolling windows fill.
    pub fn todo_index(&self, key: &str) -> Result<Vec<NaiveDateTime>> {
        let state = self
            .find(key)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown factor group: {}", key)))?;
        Ok(todo_index(&self.prices, &state.series))
    }

    /// Price rows needed to compute `todo` with fully primed windows
    pub fn raw_window(&self, todo: &[NaiveDateTime]) -> &[Bar] {
        raw_window(&self.prices, todo, self.lookback)
    }

    /// Compute every group's unseen rows; returns the total number of new rows
    pub fn build_intraday_factors(&mut self) -> Result<usize> {
        let mut total = 0;

        for i in 0..self.groups.len() {
            let todo = todo_index(&self.prices, &self.groups[i].series);
            if todo.is_empty() {
                debug!(ticker = %self.ticker, group = self.groups[i].group.key(), "Up to date");
                continue;
            }

            let window = raw_window(&self.prices, &todo, self.lookback);
            let columns = compute_factor_columns(window, &self.groups[i].group.factors);
            let offset = window.len() - todo.len();

            let state = &mut self.groups[i];
            for (row, time) in todo.iter().enumerate() {
                let values = columns.iter().map(|col| col[offset + row]).collect();
                state.series.push(*time, values)?;
            }
            state.stage = GroupStage::Extended {
                watermark: state.series.watermark(),
            };

            debug!(
                ticker = %self.ticker,
                group = state.group.key(),
                rows = todo.len(),
                window = window.len(),
                "Extended factor group"
            );
            total += todo.len();
        }

        info!(ticker = %self.ticker, rows = total, "Built intraday factors");
        Ok(total)
    }

    /// Whole-file overwrite of every group
    pub fn save_intraday_factors(&mut self) -> Result<()> {
        for state in &mut self.groups {
            save_factor_csv(&state.path, &state.series, Frequency::Intraday)?;
            state.stage = GroupStage::Persisted {
                watermark: state.series.watermark(),
            };
        }
        Ok(())
    }

    fn find(&self, key: &str) -> Option<&GroupState> {
        self.groups.iter().find(|g| g.group.key() == key)
    }
}

/// Price timestamps after the factor series' watermark (all of them if empty)
pub fn todo_index(prices: &PriceSeries, factors: &FactorSeries) -> Vec<NaiveDateTime> {
    match factors.watermark() {
        Some(watermark) => prices.times_from(prices.index_after(&watermark)),
        None => prices.times_from(0),
    }
}

/// Slice of `prices` starting `lookback` samples before the first to-do timestamp
///
/// The to-do timestamps are always a suffix of the price index, so the window
/// runs to the end of the series.
pub fn raw_window<'a>(prices: &'a PriceSeries, todo: &[NaiveDateTime], lookback: usize) -> &'a [Bar] {
    let bars = prices.bars();
    let Some(first) = todo.first() else {
        return &bars[bars.len()..];
    };

    let start = match prices.position(first) {
        Some(0) | None => 0,
        Some(pos) => pos.saturating_sub(lookback),
    };
    &bars[start..]
}

/// One column per factor, aligned with `window`
pub fn compute_factor_columns(window: &[Bar], factors: &[IntradayFactor]) -> Vec<Vec<f64>> {
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let bands = factors
        .iter()
        .any(|f| f.band_multiplier().is_some())
        .then(|| BollingerBands::compute(&closes, BOLLINGER_WINDOW));

    factors
        .iter()
        .map(|factor| match (factor.regression_window(), factor.band_multiplier(), &bands) {
            (Some(n), _, _) => rolling_regression(&closes, n),
            (None, Some(k), Some(bands)) => bands.band(k),
            _ => vec![f64::NAN; closes.len()],
        })
        .collect()
}

/// Build and save one ticker's intraday factors
pub fn build_intraday_factors(
    ticker: &str,
    factor_dir: &Path,
    price_dir: &Path,
    mode: FactorMode,
) -> Result<usize> {
    let mut engine = IntradayFactorEngine::new(ticker, factor_dir, price_dir, mode)?;
    let rows = engine.build_intraday_factors()?;
    engine.save_intraday_factors()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::fs;
    use tempfile::tempdir;

    fn minute(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
            + Duration::minutes(i as i64)
    }

    fn linear_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar::new(minute(i), close, close + 0.5, close - 0.5, close)
            })
            .collect()
    }

    /// Deterministic noisy closes so windows actually differ
    fn noisy_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 50.0 + ((i * 37) % 101) as f64 * 0.1 + (i as f64 * 0.01);
                Bar::new(minute(i), close, close + 0.2, close - 0.2, close)
            })
            .collect()
    }

    fn write_prices(dir: &Path, ticker: &str, bars: Vec<Bar>) {
        let store = PriceStore::new(dir, Frequency::Intraday);
        store.save(ticker, &PriceSeries::from_bars(bars, Frequency::Intraday)).unwrap();
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_raw_window_from_start() {
        let prices = PriceSeries::from_bars(linear_bars(500), Frequency::Intraday);
        let todo = prices.times_from(0);
        assert_eq!(raw_window(&prices, &todo, 270).len(), 500);
    }

    #[test]
    fn test_raw_window_primes_lookback() {
        let prices = PriceSeries::from_bars(linear_bars(500), Frequency::Intraday);

        let todo = prices.times_from(400);
        let window = raw_window(&prices, &todo, 270);
        assert_eq!(window.len(), 370);
        assert_eq!(window[0].time, minute(130));

        // Fewer than 270 prior samples: start at the beginning
        let todo = prices.times_from(100);
        assert_eq!(raw_window(&prices, &todo, 270).len(), 500);

        assert!(raw_window(&prices, &[], 270).is_empty());
    }

    #[test]
    fn test_regline_linear_series() {
        let bars = linear_bars(300);
        let factors = [
            IntradayFactor::RegLine10,
            IntradayFactor::RegLine30,
            IntradayFactor::RegLine90,
            IntradayFactor::RegLine270,
        ];
        let columns = compute_factor_columns(&bars, &factors);

        for (factor, column) in factors.iter().zip(&columns) {
            let n = factor.regression_window().unwrap();
            for (i, value) in column.iter().enumerate() {
                if i + 1 < n {
                    assert!(value.is_nan(), "{} at {}", factor, i);
                } else {
                    assert!(approx(*value, 100.0 + (i + 1) as f64), "{} at {}", factor, i);
                }
            }
        }
    }

    #[test]
    fn test_bollinger_constant_series() {
        let bars: Vec<Bar> = (0..60).map(|i| Bar::new(minute(i), 10.0, 10.0, 10.0, 10.0)).collect();
        let factors = IntradayFactor::all();
        let columns = compute_factor_columns(&bars, &factors);
        let mean_idx = factors.iter().position(|f| *f == IntradayFactor::BBMean).unwrap();

        for (factor, column) in factors.iter().zip(&columns) {
            if factor.band_multiplier().is_none() {
                continue;
            }
            for i in 29..60 {
                assert_eq!(column[i], columns[mean_idx][i], "{} at {}", factor, i);
            }
            assert!(column[28].is_nan());
        }
    }

    #[test]
    fn test_bands_are_symmetric() {
        let bars = noisy_bars(80);
        let factors = [IntradayFactor::BB2Up, IntradayFactor::BB2Down, IntradayFactor::BBMean];
        let columns = compute_factor_columns(&bars, &factors);

        for i in 29..80 {
            assert!(columns[0][i] > columns[2][i]);
            assert!(approx(columns[0][i] - columns[2][i], columns[2][i] - columns[1][i]));
        }
    }

    #[test]
    fn test_stage_transitions() {
        let dir = tempdir().unwrap();
        let prices = PriceSeries::from_bars(linear_bars(40), Frequency::Intraday);
        let mut engine =
            IntradayFactorEngine::with_prices("SPY", prices, dir.path(), FactorMode::Combined).unwrap();

        assert_eq!(engine.stage("combined"), Some(GroupStage::Loaded { watermark: None }));
        assert_eq!(engine.build_intraday_factors().unwrap(), 40);
        assert_eq!(
            engine.stage("combined"),
            Some(GroupStage::Extended { watermark: Some(minute(39)) })
        );
        engine.save_intraday_factors().unwrap();
        assert_eq!(
            engine.stage("combined"),
            Some(GroupStage::Persisted { watermark: Some(minute(39)) })
        );

        let prices = PriceSeries::from_bars(linear_bars(40), Frequency::Intraday);
        let reloaded =
            IntradayFactorEngine::with_prices("SPY", prices, dir.path(), FactorMode::Combined).unwrap();
        assert_eq!(
            reloaded.stage("combined"),
            Some(GroupStage::Loaded { watermark: Some(minute(39)) })
        );
        assert!(reloaded.todo_index("combined").unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let dir = tempdir().unwrap();
        let price_dir = dir.path().join("price");
        let factor_dir = dir.path().join("factor");
        write_prices(&price_dir, "SPY", noisy_bars(320));

        build_intraday_factors("SPY", &factor_dir, &price_dir, FactorMode::Combined).unwrap();
        let first = fs::read(factor_dir.join("SPY.csv")).unwrap();

        assert_eq!(
            build_intraday_factors("SPY", &factor_dir, &price_dir, FactorMode::Combined).unwrap(),
            0
        );
        assert_eq!(first, fs::read(factor_dir.join("SPY.csv")).unwrap());
    }

    #[test]
    fn test_resume_matches_full_build() {
        let dir = tempdir().unwrap();
        let price_dir = dir.path().join("price");
        let factor_dir = dir.path().join("factor");
        let scratch_dir = dir.path().join("scratch");
        let bars = noisy_bars(700);

        write_prices(&price_dir, "SPY", bars[..600].to_vec());
        build_intraday_factors("SPY", &factor_dir, &price_dir, FactorMode::Combined).unwrap();
        let before = fs::read_to_string(factor_dir.join("SPY.csv")).unwrap();

        write_prices(&price_dir, "SPY", bars.clone());
        assert_eq!(
            build_intraday_factors("SPY", &factor_dir, &price_dir, FactorMode::Combined).unwrap(),
            100
        );
        let after = fs::read_to_string(factor_dir.join("SPY.csv")).unwrap();
        assert!(after.starts_with(&before));

        build_intraday_factors("SPY", &scratch_dir, &price_dir, FactorMode::Combined).unwrap();
        assert_eq!(after, fs::read_to_string(scratch_dir.join("SPY.csv")).unwrap());
    }

    #[test]
    fn test_split_mode_independent_watermarks() {
        let dir = tempdir().unwrap();
        let price_dir = dir.path().join("price");
        let factor_dir = dir.path().join("factor");
        let bars = noisy_bars(400);

        write_prices(&price_dir, "SPY", bars[..350].to_vec());
        build_intraday_factors("SPY", &factor_dir, &price_dir, FactorMode::Split).unwrap();
        assert!(factor_dir.join("SPY_RegLine270.csv").exists());
        assert!(factor_dir.join("SPY_BB3Down.csv").exists());

        // Drop one factor file so it falls behind the others
        fs::remove_file(factor_dir.join("SPY_BBMean.csv")).unwrap();
        write_prices(&price_dir, "SPY", bars.clone());

        let mut engine =
            IntradayFactorEngine::new("SPY", &factor_dir, &price_dir, FactorMode::Split).unwrap();
        assert_eq!(engine.watermark("RegLine10"), Some(minute(349)));
        assert_eq!(engine.watermark("BBMean"), None);
        assert_eq!(engine.todo_index("RegLine10").unwrap().len(), 50);
        assert_eq!(engine.todo_index("BBMean").unwrap().len(), 400);

        // 10 groups resume with 50 rows, BBMean rebuilds all 400
        assert_eq!(engine.build_intraday_factors().unwrap(), 10 * 50 + 400);
        engine.save_intraday_factors().unwrap();

        for key in engine.group_keys() {
            assert_eq!(engine.watermark(key), Some(minute(399)), "{}", key);
        }
        assert_eq!(engine.series("BBMean").unwrap().len(), 400);
    }

    #[test]
    fn test_unknown_group() {
        let dir = tempdir().unwrap();
        let prices = PriceSeries::from_bars(linear_bars(5), Frequency::Intraday);
        let engine =
            IntradayFactorEngine::with_prices("SPY", prices, dir.path(), FactorMode::Split).unwrap();
        assert!(engine.todo_index("combined").is_err());
    }
}
