//! Backtest summary statistics.

use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub num_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub net_pnl: f64,
    pub final_equity: f64,
    pub cum_return: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
}

impl Summary {
    /// Statistics over an ordered trade list. An empty list gives zero counts
    /// and `final_equity == initial_equity`.
    pub fn compute(trades: &[Trade], initial_equity: f64) -> Self {
        let num_trades = trades.len();

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut net_pnl = 0.0_f64;
        let mut sum_returns = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            net_pnl += pnl;
            sum_returns += trade.ret_pct;
            if trade.is_win() {
                trades_won += 1;
                total_wins += pnl;
            } else if trade.is_loss() {
                trades_lost += 1;
                total_losses += pnl.abs();
            }
        }

        let win_rate = if num_trades > 0 {
            trades_won as f64 / num_trades as f64
        } else {
            0.0
        };

        let avg_return = if num_trades > 0 {
            sum_returns / num_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let final_equity = trades
            .last()
            .map(|t| t.equity_after)
            .unwrap_or(initial_equity);

        let cum_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            0.0
        };

        let path: Vec<f64> = std::iter::once(initial_equity)
            .chain(trades.iter().map(|t| t.equity_after))
            .collect();

        Summary {
            num_trades,
            trades_won,
            trades_lost,
            win_rate,
            avg_return,
            net_pnl,
            final_equity,
            cum_return,
            profit_factor,
            max_drawdown: compute_drawdown(&path),
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
fn compute_drawdown(equity_path: &[f64]) -> f64 {
    let Some(&first) = equity_path.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &equity in equity_path {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd
}
