//! On-disk state: favorite tickers and one-shot price alerts.
//!
//! Both stores are small human-editable JSON files rewritten whole on every
//! mutation. A missing or malformed file degrades to empty state, and a failed
//! save is logged without rolling back the in-memory change — the next
//! successful save catches the disk up.

use crate::models::AlertRule;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name for the favorites list, a JSON array of ticker strings.
pub const FAVORITES_FILE: &str = "favorites.json";

/// File name for the alerts map, a JSON object keyed by ticker.
pub const ALERTS_FILE: &str = "price_alerts.json";

/// Favorite tickers, stored as entered, in insertion order.
pub struct FavoritesStore {
    path: PathBuf,
    symbols: Vec<String>,
}

impl FavoritesStore {
    /// Load favorites from `path`; missing or malformed content yields an
    /// empty list.
    pub fn load(path: PathBuf) -> Self {
        let symbols = read_json(&path).unwrap_or_default();
        Self { path, symbols }
    }

    /// All favorites in insertion order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.symbols.iter().any(|s| s == ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Add `ticker` if absent, remove it if present, persisting either way.
    /// Returns whether the ticker is a favorite afterwards.
    pub fn toggle(&mut self, ticker: &str) -> bool {
        let now_favorite = match self.symbols.iter().position(|s| s == ticker) {
            Some(pos) => {
                self.symbols.remove(pos);
                false
            }
            None => {
                self.symbols.push(ticker.to_string());
                true
            }
        };
        write_json(&self.path, &self.symbols);
        now_favorite
    }
}

/// An alert that just fired, reported once to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub symbol: String,
    pub rule: AlertRule,
    /// The price that satisfied the rule
    pub price: f64,
}

impl TriggeredAlert {
    /// Notification text with the target and the observed price.
    pub fn message(&self) -> String {
        use crate::models::AlertDirection;
        let verb = match self.rule.direction {
            AlertDirection::Above => "reached target",
            AlertDirection::Below => "fell below target",
        };
        format!(
            "{} {} ${:.2}\nCurrent price: ${:.2}",
            self.symbol, verb, self.rule.target, self.price
        )
    }
}

/// One-shot price alerts, at most one rule per ticker.
pub struct AlertsStore {
    path: PathBuf,
    rules: BTreeMap<String, AlertRule>,
}

impl AlertsStore {
    /// Load alerts from `path`; missing or malformed content yields no rules.
    pub fn load(path: PathBuf) -> Self {
        let rules = read_json(&path).unwrap_or_default();
        Self { path, rules }
    }

    /// The active rule for `ticker`, if any.
    pub fn get(&self, ticker: &str) -> Option<&AlertRule> {
        self.rules.get(ticker)
    }

    /// Install a rule for `ticker`, replacing any existing one, and persist.
    pub fn set(&mut self, ticker: &str, rule: AlertRule) {
        self.rules.insert(ticker.to_string(), rule);
        write_json(&self.path, &self.rules);
    }

    /// Evaluate the rule for `ticker` against `price`. On trigger the rule is
    /// removed and the file persisted before reporting, so it can never fire
    /// twice.
    pub fn check_and_consume(&mut self, ticker: &str, price: f64) -> Option<TriggeredAlert> {
        let rule = *self.rules.get(ticker)?;
        if !rule.is_met(price) {
            return None;
        }

        self.rules.remove(ticker);
        write_json(&self.path, &self.rules);

        Some(TriggeredAlert {
            symbol: ticker.to_string(),
            rule,
            price,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    // A missing file is the normal first run; only malformed content is
    // worth a log line.
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read state file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed state file");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to serialize state");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(dir = %parent.display(), error = %e, "failed to create state directory");
                return;
            }
        }
    }
    if let Err(e) = fs::write(path, json) {
        warn!(path = %path.display(), error = %e, "failed to persist state file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertDirection;
    use tempfile::tempdir;

    #[test]
    fn test_favorites_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FavoritesStore::load(dir.path().join(FAVORITES_FILE));
        assert!(store.is_empty());
    }

    #[test]
    fn test_favorites_malformed_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FAVORITES_FILE);
        fs::write(&path, "{not json").unwrap();
        let store = FavoritesStore::load(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_favorites_toggle_is_its_own_inverse() {
        let dir = tempdir().unwrap();
        let mut store = FavoritesStore::load(dir.path().join(FAVORITES_FILE));

        assert!(store.toggle("2330.TW"));
        assert!(store.contains("2330.TW"));
        assert!(!store.toggle("2330.TW"));
        assert!(!store.contains("2330.TW"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_favorites_persist_across_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FAVORITES_FILE);

        let mut store = FavoritesStore::load(path.clone());
        store.toggle("2330.TW");
        store.toggle("2317.TW");

        let reloaded = FavoritesStore::load(path);
        assert_eq!(reloaded.symbols(), ["2330.TW", "2317.TW"]);
    }

    #[test]
    fn test_favorites_wire_format_is_a_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FAVORITES_FILE);

        let mut store = FavoritesStore::load(path.clone());
        store.toggle("2330.TW");

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, ["2330.TW"]);
    }

    #[test]
    fn test_alerts_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = AlertsStore::load(dir.path().join(ALERTS_FILE));
        assert!(store.get("2330.TW").is_none());
    }

    #[test]
    fn test_alerts_malformed_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ALERTS_FILE);
        fs::write(&path, "[1, 2, 3]").unwrap();
        let store = AlertsStore::load(path);
        assert!(store.get("2330.TW").is_none());
    }

    #[test]
    fn test_alert_set_overwrites_previous_rule() {
        let dir = tempdir().unwrap();
        let mut store = AlertsStore::load(dir.path().join(ALERTS_FILE));

        store.set(
            "2330.TW",
            AlertRule {
                target: 500.0,
                direction: AlertDirection::Above,
            },
        );
        store.set(
            "2330.TW",
            AlertRule {
                target: 450.0,
                direction: AlertDirection::Below,
            },
        );

        let rule = store.get("2330.TW").unwrap();
        assert_eq!(rule.target, 450.0);
        assert_eq!(rule.direction, AlertDirection::Below);
    }

    #[test]
    fn test_alert_triggers_once_and_is_consumed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ALERTS_FILE);
        let mut store = AlertsStore::load(path.clone());

        store.set(
            "2330.TW",
            AlertRule {
                target: 100.0,
                direction: AlertDirection::Above,
            },
        );

        // Price sequence 95, 99, 101: exactly one trigger, at 101.
        assert!(store.check_and_consume("2330.TW", 95.0).is_none());
        assert!(store.check_and_consume("2330.TW", 99.0).is_none());
        let hit = store.check_and_consume("2330.TW", 101.0).unwrap();
        assert_eq!(hit.price, 101.0);
        assert_eq!(hit.rule.target, 100.0);

        // Rule is gone, even for more extreme prices.
        assert!(store.check_and_consume("2330.TW", 150.0).is_none());
        assert!(store.get("2330.TW").is_none());

        // Consumption was persisted immediately.
        let reloaded = AlertsStore::load(path);
        assert!(reloaded.get("2330.TW").is_none());
    }

    #[test]
    fn test_alert_below_direction() {
        let dir = tempdir().unwrap();
        let mut store = AlertsStore::load(dir.path().join(ALERTS_FILE));

        store.set(
            "2317.TW",
            AlertRule {
                target: 90.0,
                direction: AlertDirection::Below,
            },
        );

        assert!(store.check_and_consume("2317.TW", 95.0).is_none());
        let hit = store.check_and_consume("2317.TW", 90.0).unwrap();
        assert_eq!(hit.rule.direction, AlertDirection::Below);
    }

    #[test]
    fn test_alert_unknown_ticker_never_triggers() {
        let dir = tempdir().unwrap();
        let mut store = AlertsStore::load(dir.path().join(ALERTS_FILE));
        assert!(store.check_and_consume("0050.TW", 1_000.0).is_none());
    }

    #[test]
    fn test_alerts_wire_format_is_a_keyed_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(ALERTS_FILE);
        let mut store = AlertsStore::load(path.clone());

        store.set(
            "2330.TW",
            AlertRule {
                target: 600.0,
                direction: AlertDirection::Above,
            },
        );

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["2330.TW"]["target"], 600.0);
        assert_eq!(parsed["2330.TW"]["type"], "above");
    }

    #[test]
    fn test_triggered_alert_message() {
        let hit = TriggeredAlert {
            symbol: "2330.TW".to_string(),
            rule: AlertRule {
                target: 600.0,
                direction: AlertDirection::Above,
            },
            price: 605.0,
        };
        let msg = hit.message();
        assert!(msg.contains("2330.TW"));
        assert!(msg.contains("$600.00"));
        assert!(msg.contains("$605.00"));
    }
}
