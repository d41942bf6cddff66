//! Background quote fetching.
//!
//! Resolves the user's ticker text to a vendor symbol (with the listing-suffix
//! fallback for numeric codes), computes the derived price fields, and hands
//! the outcome back to the controller through a single-flight worker so the
//! draw loop never blocks on the network.

use crate::api::MarketData;
use crate::models::{Period, QuoteResult};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Suffix for the primary listing venue, tried first for numeric codes.
const PRIMARY_SUFFIX: &str = ".TW";

/// Suffix for the secondary (over-the-counter) venue, tried when the primary
/// listing has no data.
const SECONDARY_SUFFIX: &str = ".TWO";

/// Why a fetch produced no quote. The message is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Please enter a ticker symbol")]
    EmptyInput,
    #[error("No data found for {0}")]
    NotFound(String),
    #[error("Fetch failed: {0}")]
    Unexpected(String),
}

/// Fetch one quote: resolve the symbol, pull history, derive price fields.
///
/// Every provider failure surfaces as [`FetchError::Unexpected`]; a metadata
/// (display-name) failure never fails the fetch.
pub async fn fetch_quote<P: MarketData>(
    provider: &P,
    input: &str,
    period: Period,
) -> Result<QuoteResult, FetchError> {
    let raw = input.trim().to_uppercase();
    if raw.is_empty() {
        return Err(FetchError::EmptyInput);
    }

    let numeric = raw.chars().all(|c| c.is_ascii_digit());
    let (range, interval) = period.resolution();

    let mut symbol = if numeric {
        format!("{raw}{PRIMARY_SUFFIX}")
    } else {
        raw.clone()
    };

    let mut bars = provider
        .history(&symbol, range, interval)
        .await
        .map_err(|e| FetchError::Unexpected(e.to_string()))?;

    // A numeric code with nothing on the primary venue may list on the
    // secondary one instead; retry exactly once.
    if bars.is_empty() && numeric {
        symbol = format!("{raw}{SECONDARY_SUFFIX}");
        debug!(%symbol, "primary listing empty, retrying secondary venue");
        bars = provider
            .history(&symbol, range, interval)
            .await
            .map_err(|e| FetchError::Unexpected(e.to_string()))?;
    }

    if bars.is_empty() {
        return Err(FetchError::NotFound(raw));
    }

    let display_name = provider
        .display_name(&symbol)
        .await
        .unwrap_or_else(|| symbol.clone());

    let last = bars[bars.len() - 1];
    let previous_close = bars.len().checked_sub(2).map(|i| bars[i].close);
    // Change math needs a usable reference close; zero or absent means the
    // fields stay unset rather than dividing by nothing.
    let reference = previous_close.filter(|&pc| pc != 0.0);

    Ok(QuoteResult {
        resolved_symbol: symbol,
        display_name,
        current_price: last.close,
        previous_close,
        day_open: last.open,
        day_high: last.high,
        day_low: last.low,
        change: reference.map(|pc| last.close - pc),
        change_percent: reference.map(|pc| (last.close - pc) / pc * 100.0),
        bars,
        period,
    })
}

/// What the worker hands back for one fetch, success or error.
#[derive(Debug)]
pub struct FetchOutcome {
    /// The ticker text the fetch was asked for
    pub input: String,
    /// The period it was asked with
    pub period: Period,
    /// Whether the user asked directly (errors shown) or a timer did (errors dropped)
    pub manual: bool,
    /// Wall time the fetch took
    pub elapsed: Duration,
    pub result: Result<QuoteResult, FetchError>,
}

/// Single-flight fetch dispatcher owned by the controller.
///
/// At most one fetch is outstanding at a time; dispatching while one is in
/// flight is a no-op (dropped, not queued). The in-flight gate clears only
/// when [`FetchWorker::poll`] delivers the outcome, so results are applied
/// exclusively from the controller's context.
pub struct FetchWorker {
    tx: mpsc::UnboundedSender<FetchOutcome>,
    rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: bool,
}

impl FetchWorker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            in_flight: false,
        }
    }

    /// Whether a fetch is currently outstanding.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Spawn a fetch unless one is already outstanding.
    ///
    /// Returns whether the request was actually dispatched.
    pub fn dispatch<P>(
        &mut self,
        provider: Arc<P>,
        input: &str,
        period: Period,
        manual: bool,
    ) -> bool
    where
        P: MarketData + 'static,
    {
        if self.in_flight {
            debug!(%input, "fetch already in flight, dropping request");
            return false;
        }
        self.in_flight = true;

        let tx = self.tx.clone();
        let input = input.to_string();
        tokio::spawn(async move {
            let started = Instant::now();
            // A panic inside the fetch must still resolve the gate, so it is
            // caught and delivered like any other unexpected failure.
            let result = AssertUnwindSafe(fetch_quote(provider.as_ref(), &input, period))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(FetchError::Unexpected("fetch task panicked".into())));

            let _ = tx.send(FetchOutcome {
                input,
                period,
                manual,
                elapsed: started.elapsed(),
                result,
            });
        });

        true
    }

    /// Take one completed outcome, if any, clearing the in-flight gate.
    pub fn poll(&mut self) -> Option<FetchOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => {
                self.in_flight = false;
                Some(outcome)
            }
            Err(_) => None,
        }
    }
}

impl Default for FetchWorker {
    fn default() -> Self {
        Self::new()
    }
}
