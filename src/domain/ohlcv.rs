//! Intraday OHLCV bar representation and series normalization.

use chrono::{DateTime, Utc};

use super::error::OrbError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    ///
    /// Without a previous close only the bar's own range counts.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = (self.high - self.low).abs();
        match prev_close {
            Some(pc) => {
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => hl,
        }
    }
}

/// Sort by timestamp and drop repeated timestamps, keeping the first
/// occurrence of each. Fails when nothing is left.
pub fn normalize_bars(mut bars: Vec<OhlcvBar>, origin: &str) -> Result<Vec<OhlcvBar>, OrbError> {
    // stable sort keeps the first occurrence first among equal timestamps
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    if bars.is_empty() {
        return Err(OrbError::EmptySeries {
            origin: origin.to_string(),
        });
    }
    Ok(bars)
}
