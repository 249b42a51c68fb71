//! Annotated bar series: the engine's input contract.
//!
//! Each raw bar is tagged with its session date and local time, the trend and
//! volume filters, the session's opening range, and the raw/entry signals.

use chrono::NaiveDate;
use tracing::info;

use super::error::OrbError;
use super::indicator::atr::calculate_atr;
use super::indicator::ema::{calculate_ema, calculate_ema_slope};
use super::indicator::sma::calculate_volume_sma;
use super::indicator::{IndicatorSeries, IndicatorType};
use super::ohlcv::OhlcvBar;
use super::opening_range::{attach_opening_ranges, OpeningRange};
use super::session::{local_parts, LocalTime};
use super::side::Side;
use super::signal::generate_signals;
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedBar {
    pub bar: OhlcvBar,
    pub session_date: NaiveDate,
    pub local_time: LocalTime,
    pub ema: Option<f64>,
    pub ema_slope: Option<f64>,
    pub volume_baseline: Option<f64>,
    pub atr: Option<f64>,
    pub opening_range: Option<OpeningRange>,
    pub signal: Option<Side>,
    pub entry_signal: Option<Side>,
}

impl AnnotatedBar {
    /// A bar with session fields only; filters, range and signals unset.
    pub fn new(bar: OhlcvBar, session_date: NaiveDate, local_time: LocalTime) -> Self {
        AnnotatedBar {
            bar,
            session_date,
            local_time,
            ema: None,
            ema_slope: None,
            volume_baseline: None,
            atr: None,
            opening_range: None,
            signal: None,
            entry_signal: None,
        }
    }
}

/// Build the annotated series from normalized bars.
///
/// Bars must already be sorted with unique timestamps (see
/// [`crate::domain::ohlcv::normalize_bars`]); an empty series is rejected.
pub fn annotate_bars(
    bars: Vec<OhlcvBar>,
    strategy: &StrategyConfig,
) -> Result<Vec<AnnotatedBar>, OrbError> {
    if bars.is_empty() {
        return Err(OrbError::EmptySeries {
            origin: "annotation input".to_string(),
        });
    }
    if bars.windows(2).any(|w| w[0].timestamp >= w[1].timestamp) {
        return Err(OrbError::data(
            "bars must be strictly ordered by timestamp",
        ));
    }

    let required = strategy.required_indicators();
    let series_for = |t: &IndicatorType| -> Option<IndicatorSeries> {
        required.contains(t).then(|| match t {
            IndicatorType::Ema(p) => calculate_ema(&bars, *p),
            IndicatorType::EmaSlope(p) => calculate_ema_slope(&calculate_ema(&bars, *p), *p),
            IndicatorType::VolumeSma(p) => calculate_volume_sma(&bars, *p),
            IndicatorType::Atr(p) => calculate_atr(&bars, *p),
        })
    };
    let ema = series_for(&IndicatorType::Ema(strategy.ema_period));
    let slope = series_for(&IndicatorType::EmaSlope(strategy.ema_period));
    let volume_sma = series_for(&IndicatorType::VolumeSma(strategy.vol_sma_period));
    let atr = series_for(&IndicatorType::Atr(strategy.atr_period));

    let value = |series: &Option<IndicatorSeries>, i: usize| {
        series.as_ref().and_then(|s| s.value_at(i))
    };

    let mut annotated: Vec<AnnotatedBar> = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let (session_date, local_time) = local_parts(bar.timestamp, strategy.timezone);
        let mut ab = AnnotatedBar::new(bar.clone(), session_date, local_time);
        ab.ema = value(&ema, i);
        ab.ema_slope = value(&slope, i);
        ab.volume_baseline = value(&volume_sma, i);
        ab.atr = value(&atr, i);
        annotated.push(ab);
    }

    let ranged_sessions = attach_opening_ranges(&mut annotated, &strategy.window);
    let entries = generate_signals(&mut annotated, &strategy.signal_config());

    info!(
        bars = annotated.len(),
        sessions_with_range = ranged_sessions,
        entry_signals = entries,
        "annotated bar series"
    );

    Ok(annotated)
}
