//! Yahoo Finance chart API data adapter.
//!
//! Fetches intraday or daily OHLCV bars from the v8 chart endpoint with a
//! bounded exponential-backoff retry. Intraday history is only served for
//! roughly the last 60 days, so intraday requests are clamped to 59 days.

use crate::domain::backtest::is_intraday;
use crate::domain::error::OrbError;
use crate::domain::ohlcv::{normalize_bars, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

pub const INTRADAY_MAX_DAYS: i64 = 59;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, OrbError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| OrbError::Provider {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, interval: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "{BASE_URL}/{symbol}?period1={start_ts}&period2={end_ts}&interval={interval}\
             &includePrePost=false"
        )
    }

    fn fetch_with_retry(&self, url: &str, symbol: &str) -> Result<String, OrbError> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(%symbol, attempt, ?delay, error = %last_error, "retrying provider request");
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.text().map_err(|e| OrbError::Provider {
                            reason: format!("failed to read response for {symbol}: {e}"),
                        });
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_error = format!("HTTP {status} for {symbol}");
                        continue;
                    }
                    return Err(OrbError::Provider {
                        reason: format!("HTTP {status} for {symbol}"),
                    });
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = e.to_string();
                }
                Err(e) => {
                    return Err(OrbError::Provider {
                        reason: e.to_string(),
                    })
                }
            }
        }

        Err(OrbError::Provider {
            reason: format!(
                "{symbol}: gave up after {} attempts: {last_error}",
                self.max_retries + 1
            ),
        })
    }
}

/// Earliest start date the provider will serve for `timeframe`.
pub fn clamp_start(timeframe: &str, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    if !is_intraday(timeframe) {
        return start;
    }
    let earliest = end - ChronoDuration::days(INTRADAY_MAX_DAYS);
    start.max(earliest)
}

/// Turn a chart API body into bars. Rows missing any price are skipped and a
/// missing volume counts as zero.
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<OhlcvBar>, OrbError> {
    let format_err = |reason: String| OrbError::Provider {
        reason: format!("{symbol}: {reason}"),
    };

    let resp: ChartResponse =
        serde_json::from_str(body).map_err(|e| format_err(format!("unexpected response: {e}")))?;

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) => return Err(format_err(format!("{}: {}", err.code, err.description))),
        (None, None) => return Err(format_err("empty result with no error".to_string())),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| format_err("result array is empty".to_string()))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| format_err("no quote data".to_string()))?;

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(timestamp) = DateTime::from_timestamp(ts, 0) else {
            return Err(format_err(format!("invalid timestamp: {ts}")));
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            continue;
        };

        bars.push(OhlcvBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, i).unwrap_or(0.0),
        });
    }

    normalize_bars(bars, &format!("provider response for {symbol}"))
}

impl DataPort for YahooAdapter {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, OrbError> {
        let start = clamp_start(timeframe, start_date, end_date);
        if start != start_date {
            info!(%symbol, requested = %start_date, %start, "intraday history clamped");
        }

        let url = Self::chart_url(symbol, timeframe, start, end_date);
        let body = self.fetch_with_retry(&url, symbol)?;
        let bars = parse_chart(symbol, &body)?;

        info!(%symbol, %timeframe, bars = bars.len(), "fetched bars from provider");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn intraday_start_clamped() {
        let end = date(2026, 2, 10);
        assert_eq!(clamp_start("5m", date(2025, 1, 1), end), end - ChronoDuration::days(59));
        assert_eq!(clamp_start("5m", date(2026, 2, 1), end), date(2026, 2, 1));
        assert_eq!(clamp_start("1d", date(2025, 1, 1), end), date(2025, 1, 1));
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let url = YahooAdapter::chart_url("^DJI", "5m", date(2025, 1, 2), date(2025, 1, 2));
        let start = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap().timestamp();
        assert!(url.contains(&format!("period1={start}")));
        assert!(url.contains(&format!("period2={}", start + 86_399)));
        assert!(url.contains("interval=5m"));
    }

    #[test]
    fn parse_chart_skips_incomplete_rows() {
        let body = r#"{"chart":{"result":[{"timestamp":[1735828200,1735828500,1735828800],
            "indicators":{"quote":[{"open":[100.0,null,101.0],"high":[101.0,102.0,102.0],
            "low":[99.5,100.0,100.5],"close":[100.5,101.5,101.8],"volume":[1000,1200,null]}]}}],
            "error":null}}"#;
        let bars = parse_chart("DIA", body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap()
        );
        assert_eq!(bars[0].volume, 1000.0);
        assert_eq!(bars[1].close, 101.8);
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn parse_chart_reports_api_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("ZZZZ", body).unwrap_err();
        match err {
            OrbError::Provider { reason } => assert!(reason.contains("Not Found")),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn parse_chart_without_rows_is_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"open":[],"high":[],"low":[],"close":[],"volume":[]}]}}],"error":null}}"#;
        let err = parse_chart("DIA", body).unwrap_err();
        assert!(matches!(err, OrbError::EmptySeries { .. }));
    }

    #[test]
    fn parse_chart_rejects_garbage() {
        assert!(matches!(
            parse_chart("DIA", "<html>").unwrap_err(),
            OrbError::Provider { .. }
        ));
    }
}
