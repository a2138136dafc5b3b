//! Incremental price download
//!
//! One update per ticker per run: narrow the requested window against the
//! stored file, fetch, merge the fresh rows over the stored tail, save.
//! Minute bars are only served for a recent window and in short spans, so
//! intraday requests are clamped and split into chunks.

use crate::constants::{INTRADAY_CHUNK_DAYS, INTRADAY_HISTORY_DAYS};
use crate::error::Result;
use crate::models::{Bar, Frequency};
use crate::services::price_store::{compute_request_window, merge, PriceStore};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

/// A market-data source
pub trait PriceSource {
    /// Bars for `ticker` between `start` and `end`, both inclusive
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<Bar>>;
}

/// What one update did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Window actually requested, `None` when the store was already current
    pub window: Option<(NaiveDate, NaiveDate)>,
    pub fetched: usize,
    pub stored: usize,
}

/// Keeps a price store current from a source
pub struct PriceFetcher<'a, S: PriceSource> {
    source: &'a S,
    store: &'a PriceStore,
    today: NaiveDate,
}

impl<'a, S: PriceSource> PriceFetcher<'a, S> {
    pub fn new(source: &'a S, store: &'a PriceStore) -> Self {
        Self {
            source,
            store,
            today: Local::now().date_naive(),
        }
    }

    /// Anchor the intraday history limit on a fixed date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Fetch what is missing for `ticker` and save the merged history
    pub fn update(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchOutcome> {
        let existing = self.store.load_or_empty(ticker)?;
        let (mut fetch_start, fetch_end) = compute_request_window(&existing, start, end);

        if self.store.frequency() == Frequency::Intraday {
            let earliest = self.today - Duration::days(INTRADAY_HISTORY_DAYS);
            if fetch_start < earliest {
                warn!(
                    ticker = %ticker,
                    requested = %fetch_start,
                    earliest = %earliest,
                    "Minute history not available that far back, clamping start"
                );
                fetch_start = earliest;
            }
        }

        if fetch_start > fetch_end {
            info!(ticker = %ticker, last = ?existing.last_time(), "Prices already up to date");
            return Ok(FetchOutcome {
                window: None,
                fetched: 0,
                stored: existing.len(),
            });
        }

        let frequency = self.store.frequency();
        let mut fresh = Vec::new();
        for (chunk_start, chunk_end) in request_chunks(fetch_start, fetch_end, frequency) {
            let bars = self.source.fetch(ticker, chunk_start, chunk_end, frequency)?;
            debug!(ticker = %ticker, start = %chunk_start, end = %chunk_end, bars = bars.len(), "Fetched chunk");
            fresh.extend(bars);
        }
        let fetched = fresh.len();

        let cutover = fetch_start.and_time(NaiveTime::MIN);
        let merged = merge(&existing, fresh, cutover, self.store.frequency());
        self.store.save(ticker, &merged)?;

        info!(
            ticker = %ticker,
            start = %fetch_start,
            end = %fetch_end,
            fetched = fetched,
            stored = merged.len(),
            "Updated price file"
        );

        Ok(FetchOutcome {
            window: Some((fetch_start, fetch_end)),
            fetched,
            stored: merged.len(),
        })
    }
}

/// Split an inclusive window into the spans one request may cover
///
/// Daily windows go in one request; intraday windows in spans of at most
/// `INTRADAY_CHUNK_DAYS` calendar days.
pub fn request_chunks(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Vec<(NaiveDate, NaiveDate)> {
    if start > end {
        return Vec::new();
    }
    if frequency == Frequency::Daily {
        return vec![(start, end)];
    }

    let mut chunks = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + Duration::days(INTRADAY_CHUNK_DAYS - 1)).min(end);
        chunks.push((chunk_start, chunk_end));
        chunk_start = chunk_end + Duration::days(1);
    }
    chunks
}
