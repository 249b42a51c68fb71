//! Concrete adapter implementations for ports.

#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
pub mod csv_adapter;
pub mod fallback_adapter;
pub mod file_config_adapter;
pub mod report_adapter;
pub mod svg_chart;
