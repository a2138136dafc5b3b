//! Yahoo Finance chart API client
//!
//! Fetches daily or minute bars from the v8 chart endpoint. Timestamps are
//! converted into the exchange's own timezone before they become file
//! index values, so minute bars line up with the trading session clock.
//!
//! The client owns a current-thread Tokio runtime and blocks on each
//! request, which keeps the rest of the pipeline synchronous.

use crate::constants::DEFAULT_EXCHANGE_TZ;
use crate::error::{Error, Result};
use crate::models::{Bar, Frequency};
use crate::services::price_fetcher::PriceSource;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

/// Base URL for the chart API
const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) pricefactor";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Blocking chart API client
pub struct YahooClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ExternalFetch(format!("Failed to create HTTP client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Io(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            client,
            runtime,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch bars between `start` and `end` inclusive
    pub async fn get_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<Bar>> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = format!("{}/{}", self.base_url, ticker);

        debug!(ticker = %ticker, %start, %end, interval = frequency.to_chart_interval(), "Requesting chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", frequency.to_chart_interval().to_string()),
                ("includePrePost", "false".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::ExternalFetch(format!(
                "{} returned HTTP {}: {}",
                ticker,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        parse_chart(&body, frequency)
    }
}

impl PriceSource for YahooClient {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Result<Vec<Bar>> {
        self.runtime
            .block_on(self.get_history(ticker, start, end, frequency))
    }
}

/// Turn a chart API body into bars
///
/// Rows with any missing OHLC value are skipped (the API pads halted
/// minutes with nulls).
fn parse_chart(body: &str, frequency: Frequency) -> Result<Vec<Bar>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| Error::ExternalFetch(format!("Malformed chart response: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(Error::ExternalFetch(format!("{}: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|mut results| results.pop())
        .ok_or_else(|| Error::ExternalFetch("Chart response has no result".to_string()))?;

    let tz_name = result
        .meta
        .exchange_timezone_name
        .unwrap_or_else(|| DEFAULT_EXCHANGE_TZ.to_string());
    let tz: Tz = tz_name.parse().map_err(|_| {
        Error::ExternalFetch(format!("Unknown exchange timezone: {}", tz_name))
    })?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0;
    for (i, ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            skipped += 1;
            continue;
        };

        let utc = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| Error::ExternalFetch(format!("Invalid timestamp: {}", ts)))?;
        let local = utc.with_timezone(&tz).naive_local();
        let time = match frequency {
            Frequency::Daily => local.date().and_time(NaiveTime::MIN),
            Frequency::Intraday => local,
        };

        let mut bar = Bar::new(time, open, high, low, close);
        bar.volume = at(&quote.volume, i);
        bars.push(bar);
    }

    if skipped > 0 {
        warn!(skipped = skipped, "Skipped chart rows with missing prices");
    }
    Ok(bars)
}
