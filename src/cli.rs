//! Command-line interface.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// A terminal dashboard for watching a single equity.
///
/// Tickerdash queries one ticker at a time, draws its price trend and
/// trading volume, and supports favorites, one-shot price alerts, and a
/// recurring auto-refresh. Numeric ticker codes resolve against the Taiwan
/// exchange listings (.TW, then .TWO).
#[derive(Parser, Debug, Clone)]
#[command(name = "tickerdash")]
#[command(version)]
#[command(about = "A terminal dashboard for a single equity's price trend and volume", long_about = None)]
pub struct Args {
    /// Ticker to query at startup
    ///
    /// Examples: 2330, 2317, AAPL. Purely numeric codes get the .TW suffix,
    /// falling back to .TWO when the primary listing has no data.
    #[arg(short = 's', long, env = "TICKERDASH_SYMBOL")]
    pub symbol: Option<String>,

    /// Initial display period
    #[arg(short = 'p', long, value_enum)]
    pub period: Option<PeriodArg>,

    /// Auto-refresh interval in seconds
    #[arg(short = 'd', long, env = "TICKERDASH_DELAY")]
    pub delay: Option<f64>,

    /// Start with auto-refresh enabled
    #[arg(short = 'a', long)]
    pub auto: bool,

    /// Configuration file path
    #[arg(short = 'c', long, env = "TICKERDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for favorites, alerts, and logs
    #[arg(long, env = "TICKERDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// API timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,
}

/// Display period options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    /// One day, hourly bars
    #[value(name = "1d")]
    Day,
    /// One week, daily bars
    #[value(name = "1w")]
    Week,
    /// One month, daily bars
    #[value(name = "1mo")]
    Month,
    /// Three months, daily bars
    #[value(name = "3mo")]
    Quarter,
    /// One year, daily bars
    #[value(name = "1y")]
    Year,
}

impl From<PeriodArg> for crate::models::Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => crate::models::Period::Day,
            PeriodArg::Week => crate::models::Period::Week,
            PeriodArg::Month => crate::models::Period::Month,
            PeriodArg::Quarter => crate::models::Period::Quarter,
            PeriodArg::Year => crate::models::Period::Year,
        }
    }
}

impl Args {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["tickerdash"]);
        assert!(args.symbol.is_none());
        assert!(args.period.is_none());
        assert!(args.delay.is_none());
        assert!(!args.auto);
    }

    #[test]
    fn test_symbol_and_period() {
        let args = Args::parse_from(["tickerdash", "-s", "2330", "-p", "3mo"]);
        assert_eq!(args.symbol.as_deref(), Some("2330"));
        assert_eq!(Period::from(args.period.unwrap()), Period::Quarter);
    }

    #[test]
    fn test_period_names_match_short_keys() {
        for key in ["1d", "1w", "1mo", "3mo", "1y"] {
            let args = Args::parse_from(["tickerdash", "-p", key]);
            let period: Period = args.period.unwrap().into();
            assert_eq!(period.key(), key);
        }
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(Args::try_parse_from(["tickerdash", "-p", "2h"]).is_err());
    }

    #[test]
    fn test_delay_and_auto() {
        let args = Args::parse_from(["tickerdash", "-d", "30", "-a"]);
        assert_eq!(args.delay, Some(30.0));
        assert!(args.auto);
    }
}
