//! Exponential Moving Average and its first difference.
//!
//! alpha = 2/(n+1), seeded with the first close (no SMA warmup):
//! EMA[0] = C[0], EMA[i] = C[i]*alpha + EMA[i-1]*(1-alpha).
//! The slope is EMA[i] - EMA[i-1] and is invalid on the first bar.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(bars.len());
    let mut ema = bars[0].close;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            ema = bar.close * alpha + ema * (1.0 - alpha);
        }
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: ema,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

pub fn calculate_ema_slope(ema: &IndicatorSeries, period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(ema.values.len());
    let mut prev: Option<f64> = None;

    for point in &ema.values {
        let current = point.get();
        let slope = match (prev, current) {
            (Some(p), Some(c)) => Some(c - p),
            _ => None,
        };
        values.push(IndicatorPoint {
            timestamp: point.timestamp,
            valid: slope.is_some(),
            value: slope.unwrap_or(0.0),
        });
        prev = current;
    }

    IndicatorSeries {
        indicator_type: IndicatorType::EmaSlope(period),
        values,
    }
}
