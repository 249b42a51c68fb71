//! Opening-range breakout strategy parameters.

use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

use super::indicator::IndicatorType;
use super::session::SessionWindow;
use super::signal::SignalConfig;

/// Where the protective stop is placed for a new trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopRule {
    /// Stop at the opening-range midpoint regardless of side.
    RangeMidpoint,
    /// Stop `multiplier` ATRs away from the entry price.
    AtrBuffer { multiplier: f64 },
}

impl StopRule {
    pub fn parse(name: &str, atr_multiplier: f64) -> Option<StopRule> {
        match name.trim().to_lowercase().as_str() {
            "midpoint" | "range_mid" => Some(StopRule::RangeMidpoint),
            "atr" => Some(StopRule::AtrBuffer {
                multiplier: atr_multiplier,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for StopRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopRule::RangeMidpoint => write!(f, "midpoint"),
            StopRule::AtrBuffer { multiplier } => write!(f, "atr x{}", multiplier),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub timezone: Tz,
    pub window: SessionWindow,
    pub ema_period: usize,
    pub vol_sma_period: usize,
    pub atr_period: usize,
    pub volume_factor: f64,
    pub slope_threshold: f64,
    pub fixed_rr: f64,
    pub stop_rule: StopRule,
    pub risk_per_trade_pct: f64,
}

impl StrategyConfig {
    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            volume_factor: self.volume_factor,
            slope_threshold: self.slope_threshold,
            window: self.window,
        }
    }

    /// Indicator columns the signal and risk stages read.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut indicators = vec![
            IndicatorType::Ema(self.ema_period),
            IndicatorType::EmaSlope(self.ema_period),
            IndicatorType::VolumeSma(self.vol_sma_period),
        ];
        if matches!(self.stop_rule, StopRule::AtrBuffer { .. }) {
            indicators.push(IndicatorType::Atr(self.atr_period));
        }
        indicators
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            timezone: chrono_tz::America::New_York,
            window: SessionWindow::default(),
            ema_period: 50,
            vol_sma_period: 20,
            atr_period: 14,
            volume_factor: 1.2,
            slope_threshold: 0.0,
            fixed_rr: 1.2,
            stop_rule: StopRule::RangeMidpoint,
            risk_per_trade_pct: 0.004,
        }
    }
}

/// Parse an IANA timezone name such as `America/New_York`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    Tz::from_str(name.trim()).ok()
}
