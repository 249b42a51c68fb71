//! Remote-first bar source with a CSV cache fallback.

use crate::adapters::csv_adapter::CsvAdapter;
use crate::domain::error::OrbError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Provider symbols to try, in order, for a configured symbol.
pub fn symbol_candidates(symbol: &str) -> Vec<String> {
    let symbol = symbol.trim();
    let mut candidates = vec![symbol.to_string()];
    if symbol.eq_ignore_ascii_case("DJI") {
        candidates.push("^DJI".to_string());
        candidates.push("DIA".to_string());
    }
    candidates
}

pub struct FallbackDataSource {
    remote: Option<Box<dyn DataPort>>,
    cache: CsvAdapter,
    save_cache: bool,
}

impl FallbackDataSource {
    /// `remote = None` makes the CSV cache the only source.
    pub fn new(remote: Option<Box<dyn DataPort>>, cache: CsvAdapter, save_cache: bool) -> Self {
        Self {
            remote,
            cache,
            save_cache,
        }
    }

    fn fetch_remote(
        &self,
        remote: &dyn DataPort,
        symbol: &str,
        timeframe: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError> {
        let mut failures = Vec::new();
        for candidate in symbol_candidates(symbol) {
            match remote.fetch_bars(&candidate, timeframe, start_date, end_date) {
                Ok(bars) => return Ok(bars),
                Err(e) => {
                    warn!(provider = remote.name(), symbol = %candidate, error = %e, "provider fetch failed");
                    failures.push(format!("{candidate}: {e}"));
                }
            }
        }
        Err(OrbError::Provider {
            reason: failures.join("; "),
        })
    }
}

impl DataPort for FallbackDataSource {
    fn name(&self) -> &str {
        "fallback"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError> {
        let Some(remote) = self.remote.as_deref() else {
            return self.cache.fetch_bars(symbol, timeframe, start_date, end_date);
        };

        let primary = match self.fetch_remote(remote, symbol, timeframe, start_date, end_date) {
            Ok(bars) => {
                if self.save_cache {
                    if let Err(e) = self.cache.save(&bars) {
                        warn!(path = %self.cache.path().display(), error = %e, "could not write CSV cache");
                    }
                }
                return Ok(bars);
            }
            Err(e) => e,
        };

        info!(path = %self.cache.path().display(), "falling back to CSV cache");
        self.cache
            .fetch_bars(symbol, timeframe, start_date, end_date)
            .map_err(|fallback| OrbError::FetchFailed {
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })
    }
}
