//! Data models for quotes, history bars, and price alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample for a time interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the interval
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
}

/// Display period selected by the user.
///
/// Each period maps to a provider (window, interval) pair that is wider than
/// the period itself so the last two bars always exist for change math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    /// One day, hourly bars
    Day,
    /// One week, daily bars
    Week,
    /// One month, daily bars (default)
    #[default]
    Month,
    /// Three months, daily bars
    Quarter,
    /// One year, daily bars
    Year,
}

impl Period {
    /// Provider (history window, bar interval) for this period.
    pub fn resolution(self) -> (&'static str, Option<&'static str>) {
        match self {
            Period::Day => ("5d", Some("1h")),
            Period::Week => ("1mo", Some("1d")),
            Period::Month => ("3mo", Some("1d")),
            Period::Quarter => ("6mo", Some("1d")),
            Period::Year => ("1y", Some("1d")),
        }
    }

    /// Short key as it appears in config files and the UI ("1d", "1mo", ...).
    pub fn key(self) -> &'static str {
        match self {
            Period::Day => "1d",
            Period::Week => "1w",
            Period::Month => "1mo",
            Period::Quarter => "3mo",
            Period::Year => "1y",
        }
    }

    /// Parse a short key; `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1d" => Some(Period::Day),
            "1w" => Some(Period::Week),
            "1mo" => Some(Period::Month),
            "3mo" => Some(Period::Quarter),
            "1y" => Some(Period::Year),
            _ => None,
        }
    }

    /// Chart title label.
    pub fn label(self) -> &'static str {
        match self {
            Period::Day => "1-Day Trend",
            Period::Week => "1-Week Trend",
            Period::Month => "1-Month Trend",
            Period::Quarter => "3-Month Trend",
            Period::Year => "1-Year Trend",
        }
    }

    /// Date format for x-axis labels: the intraday view shows hour:minute,
    /// sub-year views month-day, the yearly view year-month.
    pub fn axis_format(self) -> &'static str {
        match self {
            Period::Day => "%m-%d %H:%M",
            Period::Week | Period::Month | Period::Quarter => "%m-%d",
            Period::Year => "%Y-%m",
        }
    }

    /// All periods in display order.
    pub fn all() -> [Period; 5] {
        [
            Period::Day,
            Period::Week,
            Period::Month,
            Period::Quarter,
            Period::Year,
        ]
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The result of one successful quote fetch.
///
/// Built once by the fetcher, handed to the controller, and replaced wholesale
/// by the next fetch. `change`/`change_percent` are `None` when the previous
/// close is absent (single-bar history) or zero.
#[derive(Debug, Clone)]
pub struct QuoteResult {
    /// Vendor-recognized symbol after suffix resolution (e.g. "2330.TW")
    pub resolved_symbol: String,
    /// Human-readable name, falling back to the resolved symbol
    pub display_name: String,
    /// Last bar's close
    pub current_price: f64,
    /// Second-to-last bar's close, if the history has one
    pub previous_close: Option<f64>,
    /// Last bar's open
    pub day_open: f64,
    /// Last bar's high
    pub day_high: f64,
    /// Last bar's low
    pub day_low: f64,
    /// current_price - previous_close
    pub change: Option<f64>,
    /// change / previous_close * 100
    pub change_percent: Option<f64>,
    /// Chronological bars, never empty
    pub bars: Vec<Bar>,
    /// The period the user asked for, carried through for formatting
    pub period: Period,
}

impl QuoteResult {
    /// Last bar's volume.
    pub fn current_volume(&self) -> u64 {
        self.bars.last().map(|b| b.volume).unwrap_or(0)
    }
}

/// Which side of the target price an alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

impl std::fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertDirection::Above => write!(f, "above"),
            AlertDirection::Below => write!(f, "below"),
        }
    }
}

/// A one-shot price alert. At most one per ticker; consumed on trigger.
///
/// Serialized as `{"target": 123.0, "type": "above"}` to stay readable and
/// hand-editable in the alerts file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Target price to watch
    pub target: f64,
    /// Trigger side
    #[serde(rename = "type")]
    pub direction: AlertDirection,
}

impl AlertRule {
    /// Whether `price` satisfies this rule.
    pub fn is_met(&self, price: f64) -> bool {
        match self.direction {
            AlertDirection::Above => price >= self.target,
            AlertDirection::Below => price <= self.target,
        }
    }
}
