//! Average True Range as a simple rolling mean of true ranges.
//!
//! TR[0] = H[0] - L[0]; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR(n)[i] = mean(TR[i-n+1..=i]); the first (n-1) points are invalid.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let true_ranges: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = i.checked_sub(1).map(|j| bars[j].close);
            bar.true_range(prev_close)
        })
        .collect();

    let values = bars
        .iter()
        .zip(rolling_mean(&true_ranges, period))
        .map(|(bar, atr)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: atr.is_some(),
            value: atr.unwrap_or(0.0),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
