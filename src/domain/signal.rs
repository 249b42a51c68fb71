//! Breakout signal generation and the one-entry-per-session reduction.

use chrono::NaiveDate;
use std::collections::HashSet;

use super::annotated::AnnotatedBar;
use super::session::SessionWindow;
use super::side::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalConfig {
    pub volume_factor: f64,
    pub slope_threshold: f64,
    pub window: SessionWindow,
}

/// Per-bar breakout signal, independent of every other bar.
///
/// Any missing input (slope, volume baseline, opening range) yields `None`.
pub fn raw_signal(ab: &AnnotatedBar, config: &SignalConfig) -> Option<Side> {
    if !config.window.after_range(ab.local_time) {
        return None;
    }
    let slope = ab.ema_slope?;
    let baseline = ab.volume_baseline?;
    let range = ab.opening_range?;

    if ab.bar.volume <= config.volume_factor * baseline {
        return None;
    }

    let bullish = slope > config.slope_threshold;
    let bearish = slope < -config.slope_threshold;

    if bullish && ab.bar.close > range.high {
        Some(Side::Long)
    } else if bearish && ab.bar.close < range.low {
        Some(Side::Short)
    } else {
        None
    }
}

/// Keep only the first non-empty signal of each session as its entry signal.
///
/// Bars are scanned in slice order, which must be chronological.
pub fn reduce_entry_signals(bars: &mut [AnnotatedBar]) -> usize {
    let mut entered: HashSet<NaiveDate> = HashSet::new();
    for ab in bars.iter_mut() {
        ab.entry_signal = match ab.signal {
            Some(side) if entered.insert(ab.session_date) => Some(side),
            _ => None,
        };
    }
    entered.len()
}

/// Fill `signal` and `entry_signal` on every bar. Returns the entry count.
pub fn generate_signals(bars: &mut [AnnotatedBar], config: &SignalConfig) -> usize {
    for ab in bars.iter_mut() {
        ab.signal = raw_signal(ab, config);
    }
    reduce_entry_signals(bars)
}
