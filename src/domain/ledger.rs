//! Equity ledger: the single running account balance.

use chrono::NaiveDate;

use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub session_date: NaiveDate,
    pub equity: f64,
    /// `equity / initial_equity`
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityLedger {
    pub initial_equity: f64,
    equity: f64,
    trades: Vec<Trade>,
}

impl EquityLedger {
    pub fn new(initial_equity: f64) -> Self {
        EquityLedger {
            initial_equity,
            equity: initial_equity,
            trades: Vec::new(),
        }
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Apply a trade's pnl. Trades must arrive in session order.
    pub fn record(&mut self, trade: Trade) {
        self.equity += trade.pnl;
        self.trades.push(trade);
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.trades
            .iter()
            .map(|t| EquityPoint {
                session_date: t.session_date,
                equity: t.equity_after,
                normalized: normalized(t.equity_after, self.initial_equity),
            })
            .collect()
    }
}

pub(crate) fn normalized(equity: f64, initial_equity: f64) -> f64 {
    if initial_equity > 0.0 {
        equity / initial_equity
    } else {
        0.0
    }
}
