//! Completed trade records.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use super::side::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    /// Stop and target both touched by one bar; the stop is assumed first.
    StopLossSameBar,
    SessionClose,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "sl",
            ExitReason::TakeProfit => "tp",
            ExitReason::StopLossSameBar => "sl_same_bar",
            ExitReason::SessionClose => "session_close",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One closed intraday trade. Built once by the session simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub session_date: NaiveDate,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub size: f64,
    pub risk_amount: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub ret_pct: f64,
    pub equity_before: f64,
    pub equity_after: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    /// Flat trades count as neither a win nor a loss.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
