//! CLI definition and dispatch.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::fallback_adapter::FallbackDataSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::report_adapter::{format_summary, FileReportAdapter};
use crate::domain::annotated::annotate_bars;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, DataProvider};
use crate::domain::config_validation::{
    parse_date, parse_stop_rule, parse_time, string_or, validate_config, DEFAULT_CSV_PATH,
    DEFAULT_INITIAL_EQUITY, DEFAULT_OUTPUT_DIR, DEFAULT_PROVIDER, DEFAULT_RANGE_END,
    DEFAULT_RANGE_START, DEFAULT_SESSION_END, DEFAULT_START_DATE, DEFAULT_END_DATE,
    DEFAULT_SYMBOL, DEFAULT_TIMEFRAME, DEFAULT_TIMEZONE,
};
use crate::domain::error::OrbError;
use crate::domain::metrics::Summary;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::session::{local_parts, SessionWindow};
use crate::domain::strategy::{parse_timezone, StrategyConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "orbtrader", about = "Opening-range breakout backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Output directory for trades.csv and the report image
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// CSV cache path
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Skip the remote provider and read the CSV cache only
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar count, time span and sessions of a cached CSV
    Info {
        #[arg(long)]
        csv: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub symbol: Option<String>,
    pub csv: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub offline: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut BacktestConfig) {
        if let Some(symbol) = &self.symbol {
            config.symbol = symbol.trim().to_string();
        }
        if let Some(csv) = &self.csv {
            config.csv_path = csv.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.offline {
            config.provider = DataProvider::Csv;
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
            csv,
            offline,
            dry_run,
        } => {
            let overrides = Overrides {
                symbol,
                csv,
                output,
                offline,
            };
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest_command(&config, &overrides)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { csv, config } => run_info(&csv, config.as_deref()),
    }
}

fn fail(err: &OrbError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, OrbError> {
    let defaults = StrategyConfig::default();

    let tz_name = string_or(config, "data", "timezone", DEFAULT_TIMEZONE);
    let timezone = parse_timezone(&tz_name).ok_or_else(|| {
        OrbError::config_invalid("data", "timezone", format!("unknown timezone {tz_name:?}"))
    })?;

    let window = SessionWindow {
        range_start: parse_time(config, "session", "range_start", DEFAULT_RANGE_START)?,
        range_end: parse_time(config, "session", "range_end", DEFAULT_RANGE_END)?,
        session_end: parse_time(config, "session", "session_end", DEFAULT_SESSION_END)?,
    };

    let period = |key: &str, default: usize| -> Result<usize, OrbError> {
        let value = config.get_int("indicators", key, default as i64);
        usize::try_from(value)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| OrbError::config_invalid("indicators", key, format!("{key} must be at least 1")))
    };

    Ok(StrategyConfig {
        timezone,
        window,
        ema_period: period("ema_period", defaults.ema_period)?,
        vol_sma_period: period("vol_sma_period", defaults.vol_sma_period)?,
        atr_period: period("atr_period", defaults.atr_period)?,
        volume_factor: config.get_double("strategy", "volume_factor", defaults.volume_factor),
        slope_threshold: config.get_double("strategy", "slope_threshold", defaults.slope_threshold),
        fixed_rr: config.get_double("strategy", "fixed_rr", defaults.fixed_rr),
        stop_rule: parse_stop_rule(config)?,
        risk_per_trade_pct: config.get_double("risk", "risk_per_trade_pct", defaults.risk_per_trade_pct),
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, OrbError> {
    let provider_name = string_or(config, "data", "provider", DEFAULT_PROVIDER);
    let provider = DataProvider::parse(&provider_name).ok_or_else(|| {
        OrbError::config_invalid(
            "data",
            "provider",
            format!("unknown provider {provider_name:?}, expected yahoo or csv"),
        )
    })?;

    Ok(BacktestConfig {
        symbol: string_or(config, "data", "symbol", DEFAULT_SYMBOL),
        timeframe: string_or(config, "data", "timeframe", DEFAULT_TIMEFRAME),
        start_date: parse_date(config, "data", "start_date", DEFAULT_START_DATE)?,
        end_date: parse_date(config, "data", "end_date", DEFAULT_END_DATE)?,
        initial_equity: config.get_double("risk", "initial_equity", DEFAULT_INITIAL_EQUITY),
        provider,
        csv_path: PathBuf::from(string_or(config, "data", "csv_path", DEFAULT_CSV_PATH)),
        save_csv: config.get_bool("data", "save_csv", true),
        output_dir: PathBuf::from(string_or(config, "report", "output_dir", DEFAULT_OUTPUT_DIR)),
    })
}

/// Validate, then resolve both configs with the command-line overrides applied.
pub fn resolve_configs(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<(StrategyConfig, BacktestConfig), OrbError> {
    validate_config(config)?;
    let strategy = build_strategy_config(config)?;
    let mut bt_config = build_backtest_config(config)?;
    overrides.apply(&mut bt_config);
    if bt_config.symbol.is_empty() {
        return Err(OrbError::ConfigMissing {
            section: "data".to_string(),
            key: "symbol".to_string(),
        });
    }
    Ok((strategy, bt_config))
}

/// Remote provider followed by the CSV cache, or the cache alone when the
/// run is offline or the provider is compiled out.
pub fn build_data_source(bt_config: &BacktestConfig) -> Result<FallbackDataSource, OrbError> {
    let cache = CsvAdapter::new(bt_config.csv_path.clone());
    let remote: Option<Box<dyn DataPort>> = match bt_config.provider {
        DataProvider::Csv => None,
        DataProvider::Yahoo => remote_provider()?,
    };
    Ok(FallbackDataSource::new(remote, cache, bt_config.save_csv))
}

#[cfg(feature = "yahoo")]
fn remote_provider() -> Result<Option<Box<dyn DataPort>>, OrbError> {
    use crate::adapters::yahoo_adapter::YahooAdapter;
    Ok(Some(Box::new(YahooAdapter::new()?)))
}

#[cfg(not(feature = "yahoo"))]
fn remote_provider() -> Result<Option<Box<dyn DataPort>>, OrbError> {
    tracing::warn!("built without the yahoo feature, using the CSV cache only");
    Ok(None)
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub result: BacktestResult,
    pub summary: Summary,
    pub written: Vec<PathBuf>,
}

/// Fetch, annotate, simulate, summarize and report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    strategy: &StrategyConfig,
    bt_config: &BacktestConfig,
) -> Result<PipelineOutput, OrbError> {
    info!(
        symbol = %bt_config.symbol,
        timeframe = %bt_config.timeframe,
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        source = data_port.name(),
        "loading bars"
    );
    let bars = data_port.fetch_bars(
        &bt_config.symbol,
        &bt_config.timeframe,
        bt_config.start_date,
        bt_config.end_date,
    )?;
    info!(bars = bars.len(), "bars loaded");

    let annotated = annotate_bars(bars, strategy)?;
    let result = run_backtest(&annotated, strategy, bt_config.initial_equity);
    let summary = Summary::compute(result.trades(), bt_config.initial_equity);
    let written = report_port.write(&result, &summary, &bt_config.output_dir)?;

    Ok(PipelineOutput {
        result,
        summary,
        written,
    })
}

fn run_backtest_command(config_path: &Path, overrides: &Overrides) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (strategy, bt_config) = match resolve_configs(&adapter, overrides) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let data_source = match build_data_source(&bt_config) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    match run_backtest_pipeline(&data_source, &FileReportAdapter, &strategy, &bt_config) {
        Ok(output) => {
            print!("{}", format_summary(&bt_config.symbol, &output.summary));
            for path in &output.written {
                println!("wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Resolved parameters and indicator list, as printed by `--dry-run`.
pub fn describe_run(strategy: &StrategyConfig, bt_config: &BacktestConfig) -> String {
    let provider = match bt_config.provider {
        DataProvider::Yahoo => "yahoo (CSV fallback)",
        DataProvider::Csv => "csv",
    };

    let mut out = String::new();
    let _ = writeln!(out, "Data:");
    let _ = writeln!(out, "  symbol:     {}", bt_config.symbol);
    let _ = writeln!(out, "  timeframe:  {}", bt_config.timeframe);
    let _ = writeln!(out, "  period:     {} to {}", bt_config.start_date, bt_config.end_date);
    let _ = writeln!(out, "  provider:   {}", provider);
    let _ = writeln!(out, "  csv_path:   {}", bt_config.csv_path.display());
    let _ = writeln!(out, "  timezone:   {}", strategy.timezone.name());

    let w = &strategy.window;
    let _ = writeln!(out, "\nSession:");
    let _ = writeln!(out, "  opening range: {} - {}", w.range_start, w.range_end);
    let _ = writeln!(out, "  session end:   {}", w.session_end);

    let _ = writeln!(out, "\nStrategy:");
    let _ = writeln!(out, "  volume_factor:   {}", strategy.volume_factor);
    let _ = writeln!(out, "  slope_threshold: {}", strategy.slope_threshold);
    let _ = writeln!(out, "  fixed_rr:        {}", strategy.fixed_rr);
    let _ = writeln!(out, "  stop_rule:       {}", strategy.stop_rule);
    let _ = writeln!(out, "  risk per trade:  {}", strategy.risk_per_trade_pct);
    let _ = writeln!(out, "  initial equity:  {}", bt_config.initial_equity);

    let mut indicators: Vec<String> = strategy
        .required_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    let _ = writeln!(out, "\nIndicators to compute:");
    for ind in &indicators {
        let _ = writeln!(out, "  {ind}");
    }

    let _ = writeln!(out, "\nOutput: {}", bt_config.output_dir.display());
    out
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides) -> ExitCode {
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match resolve_configs(&adapter, overrides) {
        Ok((strategy, bt_config)) => {
            print!("{}", describe_run(&strategy, &bt_config));
            println!("\nDry run complete: configuration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_config(&adapter) {
        Ok(()) => {
            println!("{}: configuration is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Shape of a bar series as seen in one timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInfo {
    pub bars: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub sessions: usize,
}

pub fn series_info(bars: &[OhlcvBar], tz: Tz) -> Option<SeriesInfo> {
    let first = bars.first()?.timestamp;
    let last = bars.last()?.timestamp;
    let sessions: BTreeSet<_> = bars
        .iter()
        .map(|b| local_parts(b.timestamp, tz).0)
        .collect();
    Some(SeriesInfo {
        bars: bars.len(),
        first,
        last,
        sessions: sessions.len(),
    })
}

fn run_info(csv_path: &Path, config_path: Option<&Path>) -> ExitCode {
    let tz = match config_path {
        Some(path) => {
            let adapter = match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            };
            match build_strategy_config(&adapter) {
                Ok(s) => s.timezone,
                Err(e) => return fail(&e),
            }
        }
        None => StrategyConfig::default().timezone,
    };

    let bars = match CsvAdapter::new(csv_path.to_path_buf()).load() {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };

    match series_info(&bars, tz) {
        Some(info) => {
            println!("{}", csv_path.display());
            println!("  bars:     {}", info.bars);
            println!("  first:    {}", info.first.to_rfc3339_opts(SecondsFormat::Secs, true));
            println!("  last:     {}", info.last.to_rfc3339_opts(SecondsFormat::Secs, true));
            println!("  sessions: {} ({})", info.sessions, tz.name());
            ExitCode::SUCCESS
        }
        None => fail(&OrbError::EmptySeries {
            origin: csv_path.display().to_string(),
        }),
    }
}
