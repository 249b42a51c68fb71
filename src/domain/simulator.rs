//! Session trade simulator.
//!
//! Each session is replayed through a small state machine:
//!
//! ```text
//! AwaitingEntry --entry signal--> InPosition --stop/target--> Closed
//!                                      |
//!                                      +--bars exhausted--> Closed (session_close)
//! ```
//!
//! A session that never leaves `AwaitingEntry`, or whose entry cannot be sized,
//! ends without a trade and reports a [`SkipReason`].

use chrono::{DateTime, Utc};
use std::fmt;

use super::annotated::AnnotatedBar;
use super::risk::{build_risk_setup, compute_position_size, RiskSetup};
use super::session::SessionWindow;
use super::side::Side;
use super::strategy::{StopRule, StrategyConfig};
use super::trade::{ExitReason, Trade};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub window: SessionWindow,
    pub fixed_rr: f64,
    pub risk_per_trade_pct: f64,
    pub stop_rule: StopRule,
}

impl From<&StrategyConfig> for SimulationParams {
    fn from(strategy: &StrategyConfig) -> Self {
        SimulationParams {
            window: strategy.window,
            fixed_rr: strategy.fixed_rr,
            risk_per_trade_pct: strategy.risk_per_trade_pct,
            stop_rule: strategy.stop_rule,
        }
    }
}

/// Why a session produced no trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    NoEntrySignal,
    NoOpeningRange,
    InvalidRiskSetup,
    ZeroSize,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoEntrySignal => "no entry signal",
            SkipReason::NoOpeningRange => "no opening range",
            SkipReason::InvalidRiskSetup => "invalid risk setup",
            SkipReason::ZeroSize => "zero position size",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Traded(Trade),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    side: Side,
    entry_time: DateTime<Utc>,
    entry_price: f64,
    setup: RiskSetup,
    size: f64,
    risk_amount: f64,
    exit_price: f64,
    exit_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct ClosedPosition {
    position: OpenPosition,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    reason: ExitReason,
}

#[derive(Debug, Clone, Copy)]
enum SessionState {
    AwaitingEntry,
    InPosition(OpenPosition),
    Closed(ClosedPosition),
}

/// Stop/target test for one bar. The stop wins when both are touched.
pub fn check_exit(bar: &AnnotatedBar, side: Side, stop_loss: f64, take_profit: f64) -> Option<(f64, ExitReason)> {
    let sl_hit = side.is_adverse(side.adverse_extreme(bar.bar.high, bar.bar.low), stop_loss);
    let tp_hit = side.is_favorable(side.favorable_extreme(bar.bar.high, bar.bar.low), take_profit);

    match (sl_hit, tp_hit) {
        (true, true) => Some((stop_loss, ExitReason::StopLossSameBar)),
        (true, false) => Some((stop_loss, ExitReason::StopLoss)),
        (false, true) => Some((take_profit, ExitReason::TakeProfit)),
        (false, false) => None,
    }
}

fn open_position(
    entry: &AnnotatedBar,
    side: Side,
    last: &AnnotatedBar,
    equity: f64,
    params: &SimulationParams,
) -> Result<OpenPosition, SkipReason> {
    let range = entry.opening_range.ok_or(SkipReason::NoOpeningRange)?;
    let entry_price = entry.bar.close;

    let setup = build_risk_setup(
        entry_price,
        side,
        &range,
        entry.atr,
        params.stop_rule,
        params.fixed_rr,
    )
    .ok_or(SkipReason::InvalidRiskSetup)?;

    let size = compute_position_size(equity, params.risk_per_trade_pct, setup.risk_per_unit);
    if size <= 0.0 {
        return Err(SkipReason::ZeroSize);
    }

    Ok(OpenPosition {
        side,
        entry_time: entry.bar.timestamp,
        entry_price,
        setup,
        size,
        risk_amount: equity * params.risk_per_trade_pct,
        exit_price: last.bar.close,
        exit_time: last.bar.timestamp,
    })
}

impl SessionState {
    fn on_bar(
        self,
        ab: &AnnotatedBar,
        last: &AnnotatedBar,
        equity: f64,
        params: &SimulationParams,
    ) -> Result<SessionState, SkipReason> {
        match self {
            SessionState::AwaitingEntry => match ab.entry_signal {
                Some(side) => Ok(SessionState::InPosition(open_position(
                    ab, side, last, equity, params,
                )?)),
                None => Ok(self),
            },
            SessionState::InPosition(mut position) => {
                if !params.window.before_close(ab.local_time) {
                    return Ok(self);
                }
                let (sl, tp) = (position.setup.stop_loss, position.setup.take_profit);
                match check_exit(ab, position.side, sl, tp) {
                    Some((exit_price, reason)) => Ok(SessionState::Closed(ClosedPosition {
                        position,
                        exit_price,
                        exit_time: ab.bar.timestamp,
                        reason,
                    })),
                    None => {
                        position.exit_price = ab.bar.close;
                        position.exit_time = ab.bar.timestamp;
                        Ok(SessionState::InPosition(position))
                    }
                }
            }
            SessionState::Closed(_) => Ok(self),
        }
    }
}

fn settle(closed: ClosedPosition, session: &AnnotatedBar, equity: f64) -> Trade {
    let p = closed.position;
    let pnl = p.side.gain(p.entry_price, closed.exit_price) * p.size;
    let ret_pct = if equity > 0.0 { pnl / equity } else { 0.0 };

    Trade {
        session_date: session.session_date,
        side: p.side,
        entry_time: p.entry_time,
        entry_price: p.entry_price,
        stop_loss: p.setup.stop_loss,
        take_profit: p.setup.take_profit,
        size: p.size,
        risk_amount: p.risk_amount,
        exit_time: closed.exit_time,
        exit_price: closed.exit_price,
        exit_reason: closed.reason,
        pnl,
        ret_pct,
        equity_before: equity,
        equity_after: equity + pnl,
    }
}

/// Replay one session's bars (chronological) starting from `equity`.
pub fn simulate_session(
    session: &[&AnnotatedBar],
    equity: f64,
    params: &SimulationParams,
) -> SessionOutcome {
    let Some(&last) = session.last() else {
        return SessionOutcome::Skipped(SkipReason::NoEntrySignal);
    };

    let mut state = SessionState::AwaitingEntry;
    for &ab in session {
        state = match state.on_bar(ab, last, equity, params) {
            Ok(next) => next,
            Err(reason) => return SessionOutcome::Skipped(reason),
        };
        if matches!(state, SessionState::Closed(_)) {
            break;
        }
    }

    let closed = match state {
        SessionState::AwaitingEntry => return SessionOutcome::Skipped(SkipReason::NoEntrySignal),
        SessionState::InPosition(position) => ClosedPosition {
            position,
            exit_price: position.exit_price,
            exit_time: position.exit_time,
            reason: ExitReason::SessionClose,
        },
        SessionState::Closed(closed) => closed,
    };
    SessionOutcome::Traded(settle(closed, last, equity))
}
