//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::OrbError;
use crate::domain::metrics::Summary;
use std::path::{Path, PathBuf};

/// Port for persisting backtest output.
pub trait ReportPort {
    /// Write the report into `output_dir`, returning the files created.
    fn write(
        &self,
        result: &BacktestResult,
        summary: &Summary,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, OrbError>;
}
