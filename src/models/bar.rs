use crate::models::Frequency;
use crate::utils::deduplication::filter_duplicate_bars;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OHLC(V) observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Exchange-local timestamp (daily bars sit on midnight)
    pub time: NaiveDateTime,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Not every source reports volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    /// Create a bar without volume
    pub fn new(time: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Time-ordered bars for one instrument
///
/// Timestamps are strictly increasing. Construction sorts and drops
/// duplicate timestamps, keeping the last occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bars(bars: Vec<Bar>, frequency: Frequency) -> Self {
        Self {
            bars: filter_duplicate_bars(bars, frequency),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.time)
    }

    /// Position of an exact timestamp
    pub fn position(&self, time: &NaiveDateTime) -> Option<usize> {
        self.bars.binary_search_by(|b| b.time.cmp(time)).ok()
    }

    /// Index of the first bar strictly after `time`
    pub fn index_after(&self, time: &NaiveDateTime) -> usize {
        self.bars.partition_point(|b| b.time <= *time)
    }

    /// Timestamps from `start` to the end
    pub fn times_from(&self, start: usize) -> Vec<NaiveDateTime> {
        self.bars
            .get(start..)
            .map(|bars| bars.iter().map(|b| b.time).collect())
            .unwrap_or_default()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Whether any bar carries a volume
    pub fn has_volume(&self) -> bool {
        self.bars.iter().any(|b| b.volume.is_some())
    }
}
