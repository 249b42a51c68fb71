//! File report adapter: `trades.csv`, `summary.csv` and the SVG report image.

use crate::adapters::svg_chart::render_report_svg;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::OrbError;
use crate::domain::ledger::normalized;
use crate::domain::metrics::Summary;
use crate::ports::report_port::ReportPort;
use chrono::SecondsFormat;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TRADES_FILE: &str = "trades.csv";
pub const SUMMARY_FILE: &str = "summary.csv";
pub const REPORT_FILE: &str = "backtest_report.svg";

pub const TRADE_COLUMNS: [&str; 16] = [
    "session_date",
    "side",
    "entry_time",
    "entry_price",
    "stop_loss",
    "take_profit",
    "size",
    "risk_amount",
    "exit_time",
    "exit_price",
    "exit_reason",
    "pnl",
    "ret_pct",
    "equity_before",
    "equity_after",
    "equity_curve",
];

pub struct FileReportAdapter;

impl FileReportAdapter {
    fn write_trades(&self, result: &BacktestResult, path: &Path) -> Result<(), OrbError> {
        let csv_err =
            |e: csv::Error| OrbError::data(format!("failed to write {}: {}", path.display(), e));
        let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
        wtr.write_record(TRADE_COLUMNS).map_err(csv_err)?;

        let initial = result.ledger.initial_equity;
        for t in result.trades() {
            wtr.write_record([
                t.session_date.to_string(),
                t.side.as_i8().to_string(),
                t.entry_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                t.entry_price.to_string(),
                t.stop_loss.to_string(),
                t.take_profit.to_string(),
                t.size.to_string(),
                t.risk_amount.to_string(),
                t.exit_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                t.exit_price.to_string(),
                t.exit_reason.to_string(),
                t.pnl.to_string(),
                t.ret_pct.to_string(),
                t.equity_before.to_string(),
                t.equity_after.to_string(),
                normalized(t.equity_after, initial).to_string(),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// One `metric,value` row per summary statistic.
    fn write_summary(&self, summary: &Summary, path: &Path) -> Result<(), OrbError> {
        let csv_err =
            |e: csv::Error| OrbError::data(format!("failed to write {}: {}", path.display(), e));
        let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
        wtr.write_record(["metric", "value"]).map_err(csv_err)?;

        let rows = [
            ("num_trades", summary.num_trades.to_string()),
            ("trades_won", summary.trades_won.to_string()),
            ("trades_lost", summary.trades_lost.to_string()),
            ("win_rate", summary.win_rate.to_string()),
            ("avg_return", summary.avg_return.to_string()),
            ("net_pnl", summary.net_pnl.to_string()),
            ("final_equity", summary.final_equity.to_string()),
            ("cum_return", summary.cum_return.to_string()),
            ("profit_factor", summary.profit_factor.to_string()),
            ("max_drawdown", summary.max_drawdown.to_string()),
        ];
        for (metric, value) in rows {
            wtr.write_record([metric, value.as_str()]).map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for FileReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        summary: &Summary,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, OrbError> {
        fs::create_dir_all(output_dir)?;
        let mut written = Vec::new();

        let trades_path = output_dir.join(TRADES_FILE);
        self.write_trades(result, &trades_path)?;
        info!(path = %trades_path.display(), trades = result.trades().len(), "wrote trades");
        written.push(trades_path);

        let summary_path = output_dir.join(SUMMARY_FILE);
        self.write_summary(summary, &summary_path)?;
        written.push(summary_path);

        let returns_pct: Vec<f64> = result.trades().iter().map(|t| t.ret_pct * 100.0).collect();
        let svg = render_report_svg(&result.ledger.equity_curve(), &returns_pct);
        if svg.is_empty() {
            info!("no trades, skipping report image");
        } else {
            let report_path = output_dir.join(REPORT_FILE);
            fs::write(&report_path, svg)?;
            info!(path = %report_path.display(), "wrote report image");
            written.push(report_path);
        }

        Ok(written)
    }
}

fn fmt_pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Console summary table.
pub fn format_summary(symbol: &str, summary: &Summary) -> String {
    let profit_factor = if summary.profit_factor.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", summary.profit_factor)
    };

    let rows = [
        ("Trades", summary.num_trades.to_string()),
        ("Won / Lost", format!("{} / {}", summary.trades_won, summary.trades_lost)),
        ("Win rate", fmt_pct(summary.win_rate)),
        ("Avg return", fmt_pct(summary.avg_return)),
        ("Net PnL", format!("{:.2}", summary.net_pnl)),
        ("Final equity", format!("{:.2}", summary.final_equity)),
        ("Cum return", fmt_pct(summary.cum_return)),
        ("Profit factor", profit_factor),
        ("Max drawdown", fmt_pct(summary.max_drawdown)),
    ];

    let mut out = format!("Backtest summary: {symbol}\n");
    for (name, value) in rows {
        out.push_str(&format!("  {:<14} {:>14}\n", name, value));
    }
    out
}
