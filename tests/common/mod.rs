#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use orbtrader::domain::annotated::annotate_bars;
use orbtrader::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, DataProvider};
use orbtrader::domain::error::OrbError;
pub use orbtrader::domain::ohlcv::OhlcvBar;
use orbtrader::domain::strategy::StrategyConfig;
use orbtrader::ports::data_port::DataPort;
use std::cell::Cell;
use std::path::Path;

pub const INITIAL_EQUITY: f64 = 100_000.0;

pub struct MockDataPort {
    pub bars: Vec<OhlcvBar>,
    pub error: Option<String>,
    pub calls: Cell<usize>,
}

impl MockDataPort {
    pub fn new(bars: Vec<OhlcvBar>) -> Self {
        Self {
            bars,
            error: None,
            calls: Cell::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
            calls: Cell::new(0),
        }
    }
}

impl DataPort for MockDataPort {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_bars(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError> {
        self.calls.set(self.calls.get() + 1);
        match &self.error {
            Some(reason) => Err(OrbError::Provider {
                reason: reason.clone(),
            }),
            None => Ok(self.bars.clone()),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// UTC instant of a New York wall-clock time.
pub fn ny(day: NaiveDate, hhmm: &str) -> DateTime<Utc> {
    let time = NaiveTime::parse_from_str(hhmm, "%H:%M").unwrap();
    New_York
        .from_local_datetime(&day.and_time(time))
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn bar(day: NaiveDate, hhmm: &str, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: ny(day, hhmm),
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// Follow-up bar after the entry: `(time, high, low, close)`.
pub type Follow<'a> = (&'a str, f64, f64, f64);

const RANGE_TIMES: [&str; 6] = ["09:30", "09:35", "09:40", "09:45", "09:50", "09:55"];

fn with_follow(mut bars: Vec<OhlcvBar>, day: NaiveDate, follow: &[Follow]) -> Vec<OhlcvBar> {
    for &(hhmm, high, low, close) in follow {
        bars.push(bar(day, hhmm, high, low, close, 1_000.0));
    }
    bars
}

/// Opening range 100..102 with rising closes, then a high-volume close at
/// 103 at 10:00. With the 1.5 reward/risk of [`test_strategy`]: stop 101,
/// target 106.
pub fn long_breakout_session(day: NaiveDate, follow: &[Follow]) -> Vec<OhlcvBar> {
    let closes = [100.6, 101.0, 101.3, 101.5, 101.7, 101.9];
    let mut bars: Vec<OhlcvBar> = RANGE_TIMES
        .iter()
        .zip(closes)
        .map(|(t, c)| bar(day, t, (c + 0.1_f64).min(102.0), c - 0.3, c, 1_000.0))
        .collect();
    bars[0].high = 102.0;
    bars[0].low = 100.0;
    bars.push(bar(day, "10:00", 103.2, 101.8, 103.0, 5_000.0));
    with_follow(bars, day, follow)
}

/// Mirror of [`long_breakout_session`]: falling closes, a high-volume close at
/// 99 at 10:00. Stop 101, target 96.
pub fn short_breakout_session(day: NaiveDate, follow: &[Follow]) -> Vec<OhlcvBar> {
    let closes = [101.4, 101.1, 100.9, 100.7, 100.5, 100.3];
    let mut bars: Vec<OhlcvBar> = RANGE_TIMES
        .iter()
        .zip(closes)
        .map(|(t, c)| bar(day, t, c + 0.3, (c - 0.1_f64).max(100.0), c, 1_000.0))
        .collect();
    bars[0].high = 102.0;
    bars[0].low = 100.0;
    bars.push(bar(day, "10:00", 100.4, 98.8, 99.0, 5_000.0));
    with_follow(bars, day, follow)
}

/// A session that never leaves its opening range.
pub fn quiet_session(day: NaiveDate) -> Vec<OhlcvBar> {
    ["09:30", "09:45", "10:00", "10:30", "11:00"]
        .iter()
        .map(|t| bar(day, t, 101.5, 100.5, 101.0, 1_000.0))
        .collect()
}

/// Short indicator periods so a handful of bars is enough warmup.
pub fn test_strategy() -> StrategyConfig {
    StrategyConfig {
        ema_period: 3,
        vol_sma_period: 3,
        fixed_rr: 1.5,
        ..StrategyConfig::default()
    }
}

pub fn backtest(bars: Vec<OhlcvBar>, strategy: &StrategyConfig) -> BacktestResult {
    let annotated = annotate_bars(bars, strategy).unwrap();
    run_backtest(&annotated, strategy, INITIAL_EQUITY)
}

pub fn sample_config(output_dir: &Path) -> BacktestConfig {
    BacktestConfig {
        symbol: "DIA".to_string(),
        timeframe: "5m".to_string(),
        start_date: date(2025, 1, 1),
        end_date: date(2025, 1, 31),
        initial_equity: INITIAL_EQUITY,
        provider: DataProvider::Csv,
        csv_path: output_dir.join("cache.csv"),
        save_csv: false,
        output_dir: output_dir.join("out"),
    }
}
