//! Backtest run: session grouping and the equity fold.
//!
//! `BacktestConfig` holds the run-level parameters (instrument, dates, data
//! sources, output location). Strategy thresholds live in `StrategyConfig`.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::annotated::AnnotatedBar;
use super::ledger::EquityLedger;
use super::simulator::{simulate_session, SessionOutcome, SimulationParams, SkipReason};
use super::strategy::StrategyConfig;
use super::trade::Trade;

/// Bar intervals the provider understands. The first group is intraday.
pub const INTRADAY_TIMEFRAMES: &[&str] = &["1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h"];
pub const DAILY_TIMEFRAMES: &[&str] = &["1d", "5d", "1wk", "1mo", "3mo"];

pub fn is_intraday(timeframe: &str) -> bool {
    INTRADAY_TIMEFRAMES.contains(&timeframe)
}

pub fn is_known_timeframe(timeframe: &str) -> bool {
    is_intraday(timeframe) || DAILY_TIMEFRAMES.contains(&timeframe)
}

/// Where raw bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProvider {
    /// Remote provider first, CSV cache as fallback.
    Yahoo,
    /// CSV cache only.
    Csv,
}

impl DataProvider {
    pub fn parse(name: &str) -> Option<DataProvider> {
        match name.trim().to_lowercase().as_str() {
            "yahoo" => Some(DataProvider::Yahoo),
            "csv" => Some(DataProvider::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_equity: f64,
    pub provider: DataProvider,
    pub csv_path: PathBuf,
    pub save_csv: bool,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSession {
    pub session_date: NaiveDate,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub ledger: EquityLedger,
    pub skipped: Vec<SkippedSession>,
    pub sessions: usize,
}

impl BacktestResult {
    pub fn trades(&self) -> &[Trade] {
        self.ledger.trades()
    }
}

/// Group bars by session date and return each session's bars in time order.
pub fn group_sessions(bars: &[AnnotatedBar]) -> BTreeMap<NaiveDate, Vec<&AnnotatedBar>> {
    let mut sessions: BTreeMap<NaiveDate, Vec<&AnnotatedBar>> = BTreeMap::new();
    for ab in bars {
        sessions.entry(ab.session_date).or_default().push(ab);
    }
    for session in sessions.values_mut() {
        session.sort_by_key(|ab| ab.bar.timestamp);
    }
    sessions
}

/// Simulate every session in ascending date order, threading equity from
/// each trade into the next session's sizing.
pub fn run_backtest(
    bars: &[AnnotatedBar],
    strategy: &StrategyConfig,
    initial_equity: f64,
) -> BacktestResult {
    let params = SimulationParams::from(strategy);
    let sessions = group_sessions(bars);

    let mut ledger = EquityLedger::new(initial_equity);
    let mut skipped = Vec::new();

    for (session_date, session) in &sessions {
        match simulate_session(session, ledger.equity(), &params) {
            SessionOutcome::Traded(trade) => {
                debug!(
                    %session_date,
                    side = %trade.side,
                    exit_reason = %trade.exit_reason,
                    pnl = trade.pnl,
                    "trade closed"
                );
                ledger.record(trade);
            }
            SessionOutcome::Skipped(reason) => {
                debug!(%session_date, %reason, "session skipped");
                skipped.push(SkippedSession {
                    session_date: *session_date,
                    reason,
                });
            }
        }
    }

    info!(
        sessions = sessions.len(),
        trades = ledger.trades().len(),
        final_equity = ledger.equity(),
        "backtest complete"
    );

    BacktestResult {
        ledger,
        skipped,
        sessions: sessions.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotated::test_support::{annotated, day};
    use crate::domain::opening_range::OpeningRange;
    use crate::domain::side::Side;

    fn with_range(mut ab: AnnotatedBar) -> AnnotatedBar {
        ab.opening_range = Some(OpeningRange {
            session_date: ab.session_date,
            high: 102.0,
            low: 100.0,
        });
        ab
    }

    fn long_entry(d: u32) -> AnnotatedBar {
        let mut ab = with_range(annotated(day(d), "10:05", 103.2, 102.8, 103.0));
        ab.signal = Some(Side::Long);
        ab.entry_signal = Some(Side::Long);
        ab
    }

    fn strategy() -> StrategyConfig {
        StrategyConfig {
            fixed_rr: 1.5,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn provider_parse() {
        assert_eq!(DataProvider::parse("Yahoo"), Some(DataProvider::Yahoo));
        assert_eq!(DataProvider::parse("csv"), Some(DataProvider::Csv));
        assert_eq!(DataProvider::parse("bloomberg"), None);
    }

    #[test]
    fn timeframes() {
        assert!(is_intraday("5m"));
        assert!(!is_intraday("1d"));
        assert!(is_known_timeframe("1wk"));
        assert!(!is_known_timeframe("7m"));
    }

    #[test]
    fn sessions_grouped_in_date_order() {
        let bars = vec![
            annotated(day(3), "10:00", 1.0, 1.0, 1.0),
            annotated(day(2), "10:05", 1.0, 1.0, 1.0),
            annotated(day(2), "10:00", 1.0, 1.0, 1.0),
        ];
        let sessions = group_sessions(&bars);
        let dates: Vec<NaiveDate> = sessions.keys().copied().collect();
        assert_eq!(dates, vec![day(2), day(3)]);
        assert_eq!(sessions[&day(2)][0].local_time.to_string(), "10:00");
    }

    #[test]
    fn equity_threads_between_sessions() {
        let bars = vec![
            long_entry(2),
            // stop at 101: lose 400 on 100k
            with_range(annotated(day(2), "10:10", 103.0, 100.5, 101.5)),
            annotated(day(3), "10:05", 104.0, 102.0, 103.0),
            long_entry(6),
            // target at 106
            with_range(annotated(day(6), "10:10", 106.5, 103.0, 106.0)),
        ];
        let result = run_backtest(&bars, &strategy(), 100_000.0);

        assert_eq!(result.sessions, 3);
        assert_eq!(result.trades().len(), 2);
        assert_eq!(
            result.skipped,
            vec![SkippedSession {
                session_date: day(3),
                reason: SkipReason::NoEntrySignal,
            }]
        );

        let first = &result.trades()[0];
        let second = &result.trades()[1];
        assert!((first.pnl - (-400.0)).abs() < 1e-9);
        assert!((second.equity_before - first.equity_after).abs() < f64::EPSILON);
        // 99 600 * 0.004 / 2
        assert!((second.size - 199.2).abs() < 1e-9);
        assert!((result.ledger.equity() - (100_000.0 + first.pnl + second.pnl)).abs() < 1e-9);
    }

    #[test]
    fn rerun_is_identical() {
        let bars = vec![
            long_entry(2),
            with_range(annotated(day(2), "10:10", 104.0, 102.0, 103.5)),
        ];
        let a = run_backtest(&bars, &strategy(), 50_000.0);
        let b = run_backtest(&bars, &strategy(), 50_000.0);
        assert_eq!(a, b);
    }
}
