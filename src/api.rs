//! Yahoo Finance API client for historical bars and symbol metadata.
//!
//! History comes from the v8 chart endpoint, display names from the v7 quote
//! endpoint. Everything network-facing sits behind the [`MarketData`] trait so
//! the fetch path can be driven by a mock in tests.

use crate::models::Bar;
use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Chart endpoint: historical OHLCV bars.
const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Quote endpoint: symbol metadata (short/long name).
const YAHOO_QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Pretending to be a real browser because Yahoo has trust issues.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Source of market data.
///
/// `history` distinguishes "the symbol has no data" (`Ok` with an empty vec,
/// which drives the listing-suffix fallback) from transport or decode failures
/// (`Err`). `display_name` must never fail loudly; metadata is best-effort.
///
/// Futures are `Send` so a fetch can run on a spawned worker task.
pub trait MarketData: Send + Sync {
    /// Historical bars for `symbol` over a provider window, chronological.
    fn history(
        &self,
        symbol: &str,
        range: &str,
        interval: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Bar>>> + Send;

    /// Best-effort human-readable name for `symbol`.
    fn display_name(&self, symbol: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Yahoo Finance client.
pub struct YahooClient {
    client: Client,
    timeout: Duration,
}

impl YahooClient {
    /// Create a new Yahoo Finance client.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl MarketData for YahooClient {
    async fn history(&self, symbol: &str, range: &str, interval: Option<&str>) -> Result<Vec<Bar>> {
        let url = build_chart_url(symbol, range, interval);
        debug!(%url, "requesting history");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to fetch history from Yahoo Finance")?;

        // Yahoo answers 404 for symbols it does not know; that is the
        // "no data" outcome the suffix fallback keys on, not a failure.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            anyhow::bail!("Yahoo Finance API returned error: {}", response.status());
        }

        let data: ChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo Finance chart response")?;

        Ok(parse_chart_bars(data))
    }

    async fn display_name(&self, symbol: &str) -> Option<String> {
        let url = format!(
            "{}?symbols={}",
            YAHOO_QUOTE_URL,
            urlencoding::encode(symbol)
        );

        let response = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%symbol, error = %e, "metadata request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(%symbol, status = %response.status(), "metadata request rejected");
            return None;
        }

        let data: QuoteResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                debug!(%symbol, error = %e, "metadata parse failed");
                return None;
            }
        };

        data.quote_response
            .result
            .into_iter()
            .next()
            .and_then(|q| q.long_name.or(q.short_name))
            .filter(|name| !name.is_empty())
    }
}

/// Build the chart URL for a symbol, window, and optional bar interval.
fn build_chart_url(symbol: &str, range: &str, interval: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}?range={}",
        YAHOO_CHART_URL,
        urlencoding::encode(symbol),
        range
    );
    if let Some(interval) = interval {
        url.push_str("&interval=");
        url.push_str(interval);
    }
    url
}

/// Flatten Yahoo's parallel timestamp/indicator arrays into bars, skipping
/// entries with any missing OHLC field (Yahoo pads halted sessions with null).
fn parse_chart_bars(data: ChartResponse) -> Vec<Bar> {
    let Some(result) = data.chart.result.and_then(|r| r.into_iter().next()) else {
        return Vec::new();
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Vec::new();
    };

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
        ) else {
            continue;
        };

        let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
            continue;
        };

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: volumes.get(i).copied().flatten().unwrap_or(0),
        });
    }

    bars
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    #[allow(dead_code)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_response: QuoteLookup,
}

#[derive(Debug, Deserialize)]
struct QuoteLookup {
    result: Vec<QuoteMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteMeta {
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
}
