//! Sequential per-instrument batch runner
//!
//! A failing instrument is logged with its position in the batch and the run
//! moves on; nothing an instrument does can abort the batch.

use crate::error::Result;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Outcome of one batch
#[derive(Debug, Default, Clone)]
pub struct BatchStats {
    pub successful: usize,
    pub failed: usize,
    /// Rows (bars or factor rows) reported by successful instruments
    pub total_rows: usize,
    /// (ticker, error message) in batch order
    pub failures: Vec<(String, String)>,
    pub elapsed: Duration,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_processed(&self) -> usize {
        self.successful + self.failed
    }

    pub fn failed_tickers(&self) -> Vec<&str> {
        self.failures.iter().map(|(t, _)| t.as_str()).collect()
    }
}

/// Run `process` for every ticker in order, isolating failures
///
/// `process` returns the number of rows it produced.
pub fn run_batch<F>(tickers: &[String], mut process: F) -> BatchStats
where
    F: FnMut(&str) -> Result<usize>,
{
    let start_time = Instant::now();
    let total = tickers.len();
    let mut stats = BatchStats::new();

    for (i, ticker) in tickers.iter().enumerate() {
        let position = i + 1;
        info!("Processing {} ({} out of {})", ticker, position, total);

        match process(ticker) {
            Ok(rows) => {
                stats.successful += 1;
                stats.total_rows += rows;
            }
            Err(e) => {
                error!(
                    ticker = %ticker,
                    position = position,
                    total = total,
                    error = %e,
                    "Exception during processing, continuing"
                );
                stats.failed += 1;
                stats.failures.push((ticker.clone(), e.to_string()));
            }
        }
    }

    stats.elapsed = start_time.elapsed();
    stats
}
