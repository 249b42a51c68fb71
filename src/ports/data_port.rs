//! Bar source port trait.

use crate::domain::error::OrbError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Short name used in log events and error messages.
    fn name(&self) -> &str;

    /// Bars for `symbol` at `timeframe` whose UTC dates fall in
    /// `[start_date, end_date]`, sorted with unique timestamps.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError>;
}
