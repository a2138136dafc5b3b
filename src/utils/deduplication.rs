//! Frequency-aware deduplication of price bars
//!
//! Daily bars collapse on calendar date, intraday bars on the full
//! timestamp, so a re-fetched daily bar stamped at a different time of day
//! still replaces the stored one.

use crate::models::{Bar, Frequency};

/// Sort by time and drop duplicate keys, keeping the last occurrence
///
/// Every surviving bar is re-stamped with its key, so daily bars always sit
/// on midnight and match the date-only index of the factor files.
/// The sort is stable, so among equal keys "last" means last in input order.
pub fn filter_duplicate_bars(mut bars: Vec<Bar>, frequency: Frequency) -> Vec<Bar> {
    for bar in &mut bars {
        bar.time = frequency.dedup_key(&bar.time);
    }
    bars.sort_by_key(|b| b.time);

    let mut filtered: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match filtered.last_mut() {
            Some(last) if last.time == bar.time => *last = bar,
            _ => filtered.push(bar),
        }
    }

    filtered
}
