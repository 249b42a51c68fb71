//! Rolling simple mean, used for the volume baseline.
//!
//! SMA(n)[i] = mean(X[i-n+1..=i]); the first (n-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

pub fn calculate_volume_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let means = rolling_mean(&volumes, period);

    let values = bars
        .iter()
        .zip(means)
        .map(|(bar, mean)| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: mean.is_some(),
            value: mean.unwrap_or(0.0),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::VolumeSma(period),
        values,
    }
}
