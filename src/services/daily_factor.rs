//! Daily range factors
//!
//! For every date with a full 30-bar lookback, `AvgRange` and `FrogBox` are
//! the mean and sample standard deviation of the split-adjusted high-low
//! range over the window ending on that date. Only dates after the factor
//! file's watermark are computed on each run.

use crate::constants::{AVG_RANGE, DAILY_LOOKBACK, FROG_BOX};
use crate::error::{Error, Result};
use crate::models::indicators::{nan_mean, nan_sample_std, split_factors};
use crate::models::{Bar, FactorSeries, Frequency, PriceSeries};
use crate::services::factor_store::{load_factor_csv, save_factor_csv};
use crate::services::price_store::PriceStore;
use crate::utils::get_ticker_filename;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Incremental builder of one ticker's daily factor file
pub struct DailyFactorEngine {
    ticker: String,
    prices: PriceSeries,
    factors: FactorSeries,
    factor_path: PathBuf,
    lookback: usize,
}

impl DailyFactorEngine {
    /// Load the ticker's prices and any previously built factors
    pub fn new(ticker: &str, factor_dir: &Path, price_dir: &Path) -> Result<Self> {
        let prices = PriceStore::new(price_dir, Frequency::Daily).load(ticker)?;
        let factor_path = get_ticker_filename(factor_dir, ticker, None);
        let factors = load_factor_csv(&factor_path, &[AVG_RANGE, FROG_BOX])?;

        Ok(Self::from_parts(ticker, prices, factors, factor_path))
    }

    pub fn from_parts(
        ticker: &str,
        prices: PriceSeries,
        factors: FactorSeries,
        factor_path: PathBuf,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            prices,
            factors,
            factor_path,
            lookback: DAILY_LOOKBACK,
        }
    }

    pub fn factors(&self) -> &FactorSeries {
        &self.factors
    }

    /// Dates still missing from the factor series
    pub fn todo_dates(&self) -> Vec<NaiveDateTime> {
        todo_dates(&self.prices, &self.factors, self.lookback)
    }

    /// Compute factors for every unseen date; returns the number of new rows
    pub fn build_factors(&mut self) -> Result<usize> {
        let process_dates = self.todo_dates();
        if process_dates.is_empty() {
            debug!(ticker = %self.ticker, "Daily factors already up to date");
            return Ok(0);
        }

        for date in &process_dates {
            self.factors.push_empty(*date)?;
        }
        for date in &process_dates {
            self.build_single_day(date)?;
        }

        info!(
            ticker = %self.ticker,
            rows = process_dates.len(),
            watermark = ?self.factors.watermark(),
            "Built daily factors"
        );
        Ok(process_dates.len())
    }

    /// Whole-file overwrite of the factor series
    pub fn save_factors(&self) -> Result<()> {
        save_factor_csv(&self.factor_path, &self.factors, Frequency::Daily)
    }

    fn build_single_day(&mut self, date: &NaiveDateTime) -> Result<()> {
        let index = self.prices.position(date).ok_or_else(|| {
            Error::Computation(format!("{}: no price bar for {}", self.ticker, date))
        })?;
        if index + 1 < self.lookback {
            return Err(Error::Computation(format!(
                "{}: only {} bars up to {}, need {}",
                self.ticker,
                index + 1,
                date,
                self.lookback
            )));
        }

        let window = &self.prices.bars()[index + 1 - self.lookback..=index];
        let (avg_range, frog_box) = range_factors(window);

        self.factors.set(date, AVG_RANGE, avg_range)?;
        self.factors.set(date, FROG_BOX, frog_box)?;
        Ok(())
    }
}

/// Dates to process
///
/// An empty factor series starts at the first date with a full lookback;
/// otherwise every price date after the watermark.
pub fn todo_dates(prices: &PriceSeries, factors: &FactorSeries, lookback: usize) -> Vec<NaiveDateTime> {
    match factors.watermark() {
        Some(watermark) => prices.times_from(prices.index_after(&watermark)),
        None => prices.times_from(lookback.saturating_sub(1)),
    }
}

/// Mean and sample std of the split-adjusted range over `window`
pub fn range_factors(window: &[Bar]) -> (f64, f64) {
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let splits = split_factors(&closes);

    let adjusted: Vec<f64> = window
        .iter()
        .zip(&splits)
        .map(|(bar, split)| bar.range() / split)
        .collect();

    (nan_mean(&adjusted), nan_sample_std(&adjusted))
}

/// Build and save one ticker's daily factors
pub fn build_daily_factors(ticker: &str, factor_dir: &Path, price_dir: &Path) -> Result<usize> {
    let mut engine = DailyFactorEngine::new(ticker, factor_dir, price_dir)?;
    let rows = engine.build_factors()?;
    engine.save_factors()?;
    Ok(rows)
}
