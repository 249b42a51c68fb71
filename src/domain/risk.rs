//! Risk setup builder and position sizer.

use super::opening_range::OpeningRange;
use super::side::Side;
use super::strategy::StopRule;

/// Protective levels for one trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSetup {
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_per_unit: f64,
}

/// Derive stop-loss, take-profit and risk-per-unit for an entry.
///
/// Returns `None` when the stop is not on the adverse side of the entry
/// (`risk_per_unit <= 0`) or, for ATR stops, when the entry bar has no
/// positive ATR. Either way the session takes no trade.
pub fn build_risk_setup(
    entry_price: f64,
    side: Side,
    range: &OpeningRange,
    atr: Option<f64>,
    stop_rule: StopRule,
    reward_risk: f64,
) -> Option<RiskSetup> {
    let stop_loss = match stop_rule {
        StopRule::RangeMidpoint => range.midpoint(),
        StopRule::AtrBuffer { multiplier } => {
            let atr = atr.filter(|a| a.is_finite() && *a > 0.0)?;
            side.offset(entry_price, -multiplier * atr)
        }
    };

    let risk_per_unit = side.gain(stop_loss, entry_price);
    if !(risk_per_unit > 0.0) {
        return None;
    }

    Some(RiskSetup {
        stop_loss,
        take_profit: side.offset(entry_price, reward_risk * risk_per_unit),
        risk_per_unit,
    })
}

/// Units to trade so that hitting the stop loses `equity * risk_fraction`.
///
/// Zero when any input is non-positive; callers treat zero as "no trade".
pub fn compute_position_size(equity: f64, risk_fraction: f64, risk_per_unit: f64) -> f64 {
    if equity <= 0.0 || risk_fraction <= 0.0 || risk_per_unit <= 0.0 {
        return 0.0;
    }
    (equity * risk_fraction) / risk_per_unit
}
