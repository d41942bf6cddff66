//! Application state and logic.
//!
//! The controller owns every piece of UI state, the two stores, and the
//! single-flight fetch worker. All mutation happens here, on the draw-loop
//! thread; the worker only ever talks back through its channel.

use crate::api::MarketData;
use crate::cli::Args;
use crate::config::{self, Config};
use crate::fetch::{FetchOutcome, FetchWorker};
use crate::models::{AlertDirection, AlertRule, Period, QuoteResult};
use crate::store::{ALERTS_FILE, AlertsStore, FAVORITES_FILE, FavoritesStore};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Input focus of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Keys are commands
    #[default]
    Normal,
    /// Typing a ticker into the search box
    EditSymbol,
    /// Typing a target price for a new alert
    AlertPrice,
    /// Choosing the alert direction
    AlertDirection,
}

/// A modal message shown until the user presses a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
    AlertTriggered(String),
}

/// Application state.
pub struct App<P: MarketData> {
    /// Search input buffer (what the next fetch will ask for)
    pub input: String,
    /// Vendor-qualified symbol of the displayed quote
    pub current_symbol: Option<String>,
    /// The displayed quote
    pub quote: Option<QuoteResult>,
    /// Selected display period
    pub period: Period,
    /// Whether the refresh timer is running
    pub auto_refresh: bool,
    /// Input focus
    pub mode: Mode,
    /// Modal message, if any
    pub notice: Option<Notice>,
    /// Show help overlay
    pub show_help: bool,
    /// Is the app running
    pub running: bool,
    /// Favorite tickers
    pub favorites: FavoritesStore,
    /// One-shot price alerts
    pub alerts: AlertsStore,
    /// Buffer for the alert target price while the dialog is open
    pub alert_price_input: String,
    /// When the displayed quote was applied
    pub last_update: Option<DateTime<Local>>,
    /// How long the last fetch took
    pub last_elapsed: Option<Duration>,
    /// Last favorite picked with Tab
    favorites_selected: Option<usize>,
    /// Parsed alert target waiting for a direction choice
    pending_alert_target: Option<f64>,
    refresh_interval: Duration,
    last_auto_fire: Option<Instant>,
    client: Arc<P>,
    worker: FetchWorker,
}

impl<P: MarketData + 'static> App<P> {
    /// Create the application from CLI args and config.
    pub fn new(client: P, args: &Args, config: &Config) -> Result<Self> {
        let data_dir = config::resolve_data_dir(args, config);

        let input = args
            .symbol
            .clone()
            .unwrap_or_else(|| config.general.default_symbol.clone());

        let period = args
            .period
            .map(Into::into)
            .or_else(|| Period::parse(&config.general.default_period))
            .unwrap_or_default();

        // Enforce a minimum refresh interval of 1 second
        let delay = args.delay.unwrap_or(config.general.refresh_interval);
        let delay = if delay < 1.0 { 1.0 } else { delay };

        Ok(Self {
            input,
            current_symbol: None,
            quote: None,
            period,
            auto_refresh: args.auto,
            mode: Mode::Normal,
            notice: None,
            show_help: false,
            running: true,
            favorites: FavoritesStore::load(data_dir.join(FAVORITES_FILE)),
            alerts: AlertsStore::load(data_dir.join(ALERTS_FILE)),
            alert_price_input: String::new(),
            last_update: None,
            last_elapsed: None,
            favorites_selected: None,
            pending_alert_target: None,
            refresh_interval: Duration::from_secs_f64(delay),
            last_auto_fire: None,
            client: Arc::new(client),
            worker: FetchWorker::new(),
        })
    }

    /// Whether a fetch is outstanding.
    pub fn fetching(&self) -> bool {
        self.worker.in_flight()
    }

    /// Issue a fetch for the current input. A request with empty input, or
    /// while another fetch is in flight, is silently dropped.
    pub fn request_fetch(&mut self, manual: bool) {
        if self.input.trim().is_empty() {
            return;
        }
        self.worker
            .dispatch(self.client.clone(), &self.input, self.period, manual);
    }

    /// Drain at most one completed fetch and apply it to the UI state.
    pub fn poll_fetch(&mut self) {
        if let Some(outcome) = self.worker.poll() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        match outcome.result {
            Ok(quote) => {
                self.last_update = Some(Local::now());
                self.last_elapsed = Some(outcome.elapsed);
                self.current_symbol = Some(quote.resolved_symbol.clone());
                if let Some(hit) = self
                    .alerts
                    .check_and_consume(&quote.resolved_symbol, quote.current_price)
                {
                    self.notice = Some(Notice::AlertTriggered(hit.message()));
                }
                self.quote = Some(quote);
            }
            Err(err) => {
                // Timer-driven refreshes fail silently; a transient network
                // hiccup should not interrupt the user.
                if outcome.manual {
                    self.notice = Some(Notice::Error(err.to_string()));
                } else {
                    tracing::debug!(
                        input = %outcome.input,
                        period = %outcome.period,
                        error = %err,
                        "auto refresh failed"
                    );
                }
            }
        }
    }

    /// Fire the refresh timer if it is due. The single-flight gate drops the
    /// fetch when one is already outstanding.
    pub fn tick_auto_refresh(&mut self) {
        if !self.auto_refresh {
            return;
        }
        let due = match self.last_auto_fire {
            None => true,
            Some(fired) => fired.elapsed() >= self.refresh_interval,
        };
        if due {
            self.last_auto_fire = Some(Instant::now());
            self.request_fetch(false);
        }
    }

    /// Toggle the refresh timer. Enabling fires promptly.
    pub fn toggle_auto_refresh(&mut self) {
        self.auto_refresh = !self.auto_refresh;
        self.last_auto_fire = None;
    }

    /// Switch period and refetch with the new resolution.
    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.request_fetch(true);
    }

    /// Star or unstar the displayed symbol.
    pub fn toggle_favorite(&mut self) {
        let Some(symbol) = self.current_symbol.clone() else {
            self.notice = Some(Notice::Info("Search for a stock first".to_string()));
            return;
        };
        if self.favorites.toggle(&symbol) {
            self.notice = Some(Notice::Info(format!("Added {symbol} to favorites")));
        } else {
            self.notice = Some(Notice::Info(format!("Removed {symbol} from favorites")));
        }
    }

    /// Whether the displayed symbol is a favorite.
    pub fn is_favorite(&self) -> bool {
        self.current_symbol
            .as_deref()
            .map(|s| self.favorites.contains(s))
            .unwrap_or(false)
    }

    /// Index of the favorite last picked with [`App::select_next_favorite`].
    pub fn selected_favorite(&self) -> Option<usize> {
        self.favorites_selected
    }

    /// Pick the next favorite and fetch it, stripping the listing suffix the
    /// way a user would type the code.
    pub fn select_next_favorite(&mut self) {
        if self.favorites.is_empty() {
            self.notice = Some(Notice::Info("No favorites yet".to_string()));
            return;
        }
        let next = match self.favorites_selected {
            Some(i) => (i + 1) % self.favorites.len(),
            None => 0,
        };
        self.favorites_selected = Some(next);
        self.input = strip_listing_suffix(&self.favorites.symbols()[next]).to_string();
        self.request_fetch(true);
    }

    /// Begin editing the search input.
    pub fn start_symbol_entry(&mut self) {
        self.mode = Mode::EditSymbol;
    }

    /// Finish editing and search.
    pub fn submit_symbol(&mut self) {
        self.mode = Mode::Normal;
        self.request_fetch(true);
    }

    /// Open the two-step alert dialog (target price, then direction).
    pub fn open_alert_dialog(&mut self) {
        if self.current_symbol.is_none() {
            self.notice = Some(Notice::Info("Search for a stock first".to_string()));
            return;
        }
        self.alert_price_input.clear();
        self.pending_alert_target = None;
        self.mode = Mode::AlertPrice;
    }

    /// Validate the typed target price and move to the direction step.
    pub fn submit_alert_price(&mut self) {
        match self.alert_price_input.trim().parse::<f64>() {
            Ok(target) if target > 0.0 && target.is_finite() => {
                self.pending_alert_target = Some(target);
                self.mode = Mode::AlertDirection;
            }
            _ => {
                self.mode = Mode::Normal;
                self.notice = Some(Notice::Error(
                    "Please enter a positive target price".to_string(),
                ));
            }
        }
    }

    /// Install the pending alert with the chosen direction.
    pub fn choose_alert_direction(&mut self, direction: AlertDirection) {
        let (Some(symbol), Some(target)) =
            (self.current_symbol.clone(), self.pending_alert_target)
        else {
            self.mode = Mode::Normal;
            return;
        };
        self.alerts.set(&symbol, AlertRule { target, direction });
        self.pending_alert_target = None;
        self.mode = Mode::Normal;
        self.notice = Some(Notice::Info(format!(
            "Alert set for {symbol}\nTarget: ${target:.2} ({direction})"
        )));
    }

    /// Leave any dialog without changing anything.
    pub fn cancel_dialog(&mut self) {
        self.alert_price_input.clear();
        self.pending_alert_target = None;
        self.mode = Mode::Normal;
    }

    /// Clear the modal message.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn should_quit(&self) -> bool {
        !self.running
    }

    /// Time since the displayed quote was applied, human readable.
    pub fn time_since_update(&self) -> String {
        match self.last_update {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "never".to_string(),
        }
    }
}

/// Strip the listing-venue suffix so a favorite reads like the code the user
/// typed. The longer suffix is tried first; "2330.TWO" must not become
/// "2330O".
pub fn strip_listing_suffix(symbol: &str) -> &str {
    symbol
        .strip_suffix(".TWO")
        .or_else(|| symbol.strip_suffix(".TW"))
        .unwrap_or(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::models::Bar;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use clap::Parser;
    use tempfile::{TempDir, tempdir};

    /// Provider that never returns data; app tests exercise state, not I/O.
    struct NullProvider;

    impl MarketData for NullProvider {
        async fn history(
            &self,
            _symbol: &str,
            _range: &str,
            _interval: Option<&str>,
        ) -> Result<Vec<Bar>> {
            Ok(Vec::new())
        }

        async fn display_name(&self, _symbol: &str) -> Option<String> {
            None
        }
    }

    fn test_app(extra: &[&str]) -> (App<NullProvider>, TempDir) {
        let dir = tempdir().unwrap();
        let mut argv = vec![
            "tickerdash".to_string(),
            "--data-dir".to_string(),
            dir.path().to_string_lossy().into_owned(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let args = Args::parse_from(argv);
        let app = App::new(NullProvider, &args, &Config::default()).unwrap();
        (app, dir)
    }

    fn make_quote(symbol: &str, price: f64) -> QuoteResult {
        QuoteResult {
            resolved_symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            current_price: price,
            previous_close: Some(price - 1.0),
            day_open: price - 0.5,
            day_high: price + 1.0,
            day_low: price - 2.0,
            change: Some(1.0),
            change_percent: Some(1.0),
            bars: vec![Bar {
                timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                open: price - 0.5,
                high: price + 1.0,
                low: price - 2.0,
                close: price,
                volume: 1_000,
            }],
            period: Period::Month,
        }
    }

    fn success_outcome(symbol: &str, price: f64, manual: bool) -> FetchOutcome {
        FetchOutcome {
            input: symbol.to_string(),
            period: Period::Month,
            manual,
            elapsed: Duration::from_millis(10),
            result: Ok(make_quote(symbol, price)),
        }
    }

    #[test]
    fn test_defaults_from_config() {
        let (app, _dir) = test_app(&[]);
        assert_eq!(app.input, "2330");
        assert_eq!(app.period, Period::Month);
        assert!(!app.auto_refresh);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn test_cli_overrides() {
        let (app, _dir) = test_app(&["-s", "AAPL", "-p", "1y", "-a"]);
        assert_eq!(app.input, "AAPL");
        assert_eq!(app.period, Period::Year);
        assert!(app.auto_refresh);
    }

    #[test]
    fn test_toggle_favorite_requires_quote() {
        let (mut app, _dir) = test_app(&[]);
        app.toggle_favorite();
        assert!(matches!(app.notice, Some(Notice::Info(_))));
        assert!(app.favorites.is_empty());
    }

    #[test]
    fn test_toggle_favorite_round_trip() {
        let (mut app, _dir) = test_app(&[]);
        app.current_symbol = Some("2330.TW".to_string());

        app.toggle_favorite();
        assert!(app.is_favorite());
        app.toggle_favorite();
        assert!(!app.is_favorite());
        assert!(app.favorites.is_empty());
    }

    #[test]
    fn test_alert_dialog_flow() {
        let (mut app, _dir) = test_app(&[]);
        app.current_symbol = Some("2330.TW".to_string());

        app.open_alert_dialog();
        assert_eq!(app.mode, Mode::AlertPrice);

        app.alert_price_input.push_str("600");
        app.submit_alert_price();
        assert_eq!(app.mode, Mode::AlertDirection);

        app.choose_alert_direction(AlertDirection::Above);
        assert_eq!(app.mode, Mode::Normal);

        let rule = app.alerts.get("2330.TW").unwrap();
        assert_eq!(rule.target, 600.0);
        assert_eq!(rule.direction, AlertDirection::Above);
    }

    #[test]
    fn test_alert_dialog_rejects_bad_price() {
        let (mut app, _dir) = test_app(&[]);
        app.current_symbol = Some("2330.TW".to_string());

        app.open_alert_dialog();
        app.alert_price_input.push_str("not a price");
        app.submit_alert_price();

        assert_eq!(app.mode, Mode::Normal);
        assert!(matches!(app.notice, Some(Notice::Error(_))));
        assert!(app.alerts.get("2330.TW").is_none());
    }

    #[test]
    fn test_alert_dialog_requires_quote() {
        let (mut app, _dir) = test_app(&[]);
        app.open_alert_dialog();
        assert_eq!(app.mode, Mode::Normal);
        assert!(matches!(app.notice, Some(Notice::Info(_))));
    }

    #[test]
    fn test_success_outcome_applies_quote_and_consumes_alert() {
        let (mut app, _dir) = test_app(&[]);
        app.alerts.set(
            "2330.TW",
            AlertRule {
                target: 100.0,
                direction: AlertDirection::Above,
            },
        );

        app.apply_outcome(success_outcome("2330.TW", 105.0, false));

        assert!(matches!(app.notice, Some(Notice::AlertTriggered(_))));
        assert!(app.alerts.get("2330.TW").is_none());
        assert_eq!(app.current_symbol.as_deref(), Some("2330.TW"));
        assert_eq!(app.quote.as_ref().unwrap().current_price, 105.0);
        assert!(app.last_update.is_some());
    }

    #[test]
    fn test_manual_error_raises_notice() {
        let (mut app, _dir) = test_app(&[]);
        app.apply_outcome(FetchOutcome {
            input: "9999".to_string(),
            period: Period::Month,
            manual: true,
            elapsed: Duration::from_millis(5),
            result: Err(FetchError::NotFound("9999".to_string())),
        });
        assert!(matches!(app.notice, Some(Notice::Error(_))));
    }

    #[test]
    fn test_auto_error_is_silent() {
        let (mut app, _dir) = test_app(&[]);
        app.apply_outcome(FetchOutcome {
            input: "9999".to_string(),
            period: Period::Month,
            manual: false,
            elapsed: Duration::from_millis(5),
            result: Err(FetchError::NotFound("9999".to_string())),
        });
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_select_next_favorite_strips_suffix() {
        let (mut app, _dir) = test_app(&[]);
        app.favorites.toggle("5483.TWO");
        app.favorites.toggle("2330.TW");

        app.select_next_favorite();
        assert_eq!(app.selected_favorite(), Some(0));
        assert_eq!(app.input, "5483");

        // The first fetch is still in flight, so the second pick moves the
        // cursor but its fetch is dropped by the single-flight gate.
        app.select_next_favorite();
        assert_eq!(app.selected_favorite(), Some(1));
        assert_eq!(app.input, "2330");
    }

    #[test]
    fn test_select_next_favorite_with_none() {
        let (mut app, _dir) = test_app(&[]);
        app.select_next_favorite();
        assert!(matches!(app.notice, Some(Notice::Info(_))));
    }

    #[test]
    fn test_strip_listing_suffix() {
        assert_eq!(strip_listing_suffix("2330.TW"), "2330");
        assert_eq!(strip_listing_suffix("5483.TWO"), "5483");
        assert_eq!(strip_listing_suffix("AAPL"), "AAPL");
    }
}
