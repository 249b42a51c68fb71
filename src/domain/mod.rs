//! Core domain types and logic.

pub mod ohlcv;
pub mod side;
pub mod session;
pub mod indicator;
pub mod opening_range;
pub mod annotated;
pub mod signal;
pub mod risk;
pub mod trade;
pub mod simulator;
pub mod ledger;
pub mod metrics;
pub mod backtest;
pub mod strategy;
pub mod config_validation;
pub mod error;
