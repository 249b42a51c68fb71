//! Technical indicators feeding the signal filters.
//!
//! - `IndicatorPoint`: one timestamped value with a warmup validity flag
//! - `IndicatorType`: indicator identity + parameters, used for labels
//! - `IndicatorSeries`: a time series of indicator values aligned to the bars

pub mod atr;
pub mod ema;
pub mod sma;

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    /// The value, or `None` while the indicator is still warming up.
    pub fn get(&self) -> Option<f64> {
        (self.valid && self.value.is_finite()).then_some(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    EmaSlope(usize),
    VolumeSma(usize),
    Atr(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(IndicatorPoint::get)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::EmaSlope(period) => write!(f, "EMA_SLOPE({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOL_SMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Ema(50).to_string(), "EMA(50)");
        assert_eq!(IndicatorType::EmaSlope(50).to_string(), "EMA_SLOPE(50)");
        assert_eq!(IndicatorType::VolumeSma(20).to_string(), "VOL_SMA(20)");
        assert_eq!(IndicatorType::Atr(14).to_string(), "ATR(14)");
    }

    #[test]
    fn point_get_respects_validity() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap();
        let warm = IndicatorPoint {
            timestamp: ts,
            valid: false,
            value: 3.0,
        };
        let ready = IndicatorPoint {
            valid: true,
            ..warm.clone()
        };
        assert_eq!(warm.get(), None);
        assert_eq!(ready.get(), Some(3.0));
    }

    #[test]
    fn value_at_out_of_bounds() {
        let series = IndicatorSeries::empty(IndicatorType::Atr(14));
        assert_eq!(series.value_at(0), None);
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Ema(50), "ema");
        map.insert(IndicatorType::EmaSlope(50), "slope");

        assert_eq!(map.get(&IndicatorType::Ema(50)), Some(&"ema"));
        assert_eq!(map.get(&IndicatorType::EmaSlope(50)), Some(&"slope"));
        assert_eq!(map.get(&IndicatorType::Ema(20)), None);
    }
}
