//! CSV bar cache adapter.
//!
//! Reads any OHLCV CSV whose header names the required columns (case
//! insensitive, with `date`/`timestamp` and `adjclose` aliases) and writes the
//! canonical `datetime,open,high,low,close,volume` layout with UTC RFC 3339
//! timestamps.

use crate::domain::error::OrbError;
use crate::domain::ohlcv::{normalize_bars, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REQUIRED_COLUMNS: [&str; 6] = ["datetime", "open", "high", "low", "close", "volume"];

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every bar in the file, sorted and de-duplicated.
    pub fn load(&self) -> Result<Vec<OhlcvBar>, OrbError> {
        let file = File::open(&self.path).map_err(|e| {
            OrbError::data(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let bars = read_bars(file)?;
        normalize_bars(bars, &self.path.display().to_string())
    }

    /// Overwrite the cache with `bars`, creating parent directories.
    pub fn save(&self, bars: &[OhlcvBar]) -> Result<(), OrbError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let csv_err = |e: csv::Error| {
            OrbError::data(format!("failed to write {}: {}", self.path.display(), e))
        };
        let mut wtr = csv::Writer::from_path(&self.path).map_err(csv_err)?;
        wtr.write_record(REQUIRED_COLUMNS).map_err(csv_err)?;
        for bar in bars {
            wtr.write_record([
                bar.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;

        info!(path = %self.path.display(), bars = bars.len(), "saved CSV cache");
        Ok(())
    }
}

impl DataPort for CsvAdapter {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_bars(
        &self,
        _symbol: &str,
        _timeframe: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError> {
        let bars: Vec<OhlcvBar> = self
            .load()?
            .into_iter()
            .filter(|b| {
                let date = b.timestamp.date_naive();
                date >= start_date && date <= end_date
            })
            .collect();

        if bars.is_empty() {
            return Err(OrbError::EmptySeries {
                origin: format!(
                    "{} between {} and {}",
                    self.path.display(),
                    start_date,
                    end_date
                ),
            });
        }

        info!(path = %self.path.display(), bars = bars.len(), "loaded bars from CSV");
        Ok(bars)
    }
}

/// Column positions of the required fields in a header row.
fn column_indices(headers: &csv::StringRecord) -> Result<[usize; 6], OrbError> {
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let find = |name: &str| names.iter().position(|n| n == name);

    let resolve = |column: &str| -> Option<usize> {
        match column {
            "datetime" => find("datetime")
                .or_else(|| find("date"))
                .or_else(|| find("timestamp")),
            "close" => find("close")
                .or_else(|| find("adjclose"))
                .or_else(|| find("adj close"))
                .or_else(|| find("adj_close")),
            other => find(other),
        }
    };

    let mut indices = [0usize; 6];
    let mut missing = Vec::new();
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        match resolve(column) {
            Some(i) => *slot = i,
            None => missing.push(column.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(OrbError::MissingColumns { columns: missing })
    }
}

/// Parse a timestamp in any accepted layout. Values without an offset are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse CSV rows into bars in file order. Rows are 1-based, excluding the
/// header, in error messages.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<OhlcvBar>, OrbError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| OrbError::data(format!("CSV header error: {e}")))?
        .clone();
    let [ts_i, open_i, high_i, low_i, close_i, volume_i] = column_indices(&headers)?;

    let mut bars = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| OrbError::data(format!("CSV parse error: {e}")))?;

        let raw_ts = record.get(ts_i).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| OrbError::InvalidTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;

        let number = |index: usize, column: &str| -> Result<f64, OrbError> {
            let raw = record.get(index).unwrap_or_default();
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| OrbError::InvalidValue {
                    row,
                    column: column.to_string(),
                    value: raw.to_string(),
                })
        };

        bars.push(OhlcvBar {
            timestamp,
            open: number(open_i, "open")?,
            high: number(high_i, "high")?,
            low: number(low_i, "low")?,
            close: number(close_i, "close")?,
            volume: number(volume_i, "volume")?,
        });
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const SAMPLE: &str = "Datetime,Open,High,Low,Close,Volume\n\
        2025-01-02 14:35:00+00:00,101.0,102.0,100.5,101.5,1200\n\
        2025-01-02 14:30:00+00:00,100.0,101.0,99.5,100.5,1000\n\
        2025-01-02 14:35:00+00:00,999.0,999.0,999.0,999.0,1\n\
        2025-01-03 14:30:00+00:00,102.0,103.0,101.0,102.5,900\n";

    fn write_csv(content: &str) -> (TempDir, CsvAdapter) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.csv");
        fs::write(&path, content).unwrap();
        (dir, CsvAdapter::new(path))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn load_sorts_and_drops_duplicates() {
        let (_dir, adapter) = write_csv(SAMPLE);
        let bars = adapter.load().unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap()
        );
        // first occurrence of the duplicated 14:35 row wins
        assert_eq!(bars[1].close, 101.5);
        assert_eq!(bars[1].volume, 1200.0);
    }

    #[test]
    fn fetch_bars_filters_by_date() {
        let (_dir, adapter) = write_csv(SAMPLE);
        let bars = adapter.fetch_bars("DIA", "5m", date(3), date(3)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 102.5);
    }

    #[test]
    fn fetch_bars_outside_range_is_empty_series() {
        let (_dir, adapter) = write_csv(SAMPLE);
        let err = adapter.fetch_bars("DIA", "5m", date(10), date(11)).unwrap_err();
        assert!(matches!(err, OrbError::EmptySeries { .. }));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("absent.csv"));
        assert!(adapter.load().is_err());
    }

    #[test]
    fn header_aliases() {
        let content = "Date,open,high,low,AdjClose,volume\n2025-01-02 09:30:00,1,2,0.5,1.5,10\n";
        let bars = read_bars(content.as_bytes()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2025, 1, 2, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn missing_columns_listed() {
        let content = "datetime,open,close\n2025-01-02 09:30:00,1,1\n";
        match read_bars(content.as_bytes()).unwrap_err() {
            OrbError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["high", "low", "volume"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_timestamp_fails_fast() {
        let content = "datetime,open,high,low,close,volume\n\
            2025-01-02 09:30:00,1,2,0.5,1.5,10\n\
            yesterday,1,2,0.5,1.5,10\n";
        let err = read_bars(content.as_bytes()).unwrap_err();
        assert!(
            matches!(err, OrbError::InvalidTimestamp { row, ref value } if row == 2 && value == "yesterday")
        );
    }

    #[test]
    fn non_numeric_price_fails() {
        let content = "datetime,open,high,low,close,volume\n2025-01-02 09:30:00,1,x,0.5,1.5,10\n";
        let err = read_bars(content.as_bytes()).unwrap_err();
        assert!(matches!(err, OrbError::InvalidValue { ref column, .. } if column == "high"));
    }

    #[test]
    fn timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap();
        for value in [
            "2025-01-02T14:30:00Z",
            "2025-01-02T09:30:00-05:00",
            "2025-01-02 09:30:00-05:00",
            "2025-01-02 14:30:00",
            "2025-01-02T14:30:00",
            "2025-01-02 14:30",
        ] {
            assert_eq!(parse_timestamp(value), Some(expected), "{value}");
        }
        assert_eq!(
            parse_timestamp("2025-01-02"),
            Some(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("02/01/2025"), None);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().join("nested").join("cache.csv"));
        let bars = vec![OhlcvBar {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap(),
            open: 100.25,
            high: 101.0,
            low: 99.5,
            close: 100.75,
            volume: 1500.0,
        }];

        adapter.save(&bars).unwrap();
        let written = fs::read_to_string(adapter.path()).unwrap();
        assert!(written.starts_with("datetime,open,high,low,close,volume\n"));
        assert!(written.contains("2025-01-02T14:30:00Z"));
        assert_eq!(adapter.load().unwrap(), bars);
    }
}
