//! SVG rendering of the backtest report: the normalized equity curve on top
//! and the per-trade return histogram below.

use crate::domain::ledger::EquityPoint;

pub const HISTOGRAM_BINS: usize = 30;

const CHART_WIDTH: f64 = 800.0;
const PANEL_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// One histogram bucket `[lower, upper)`; the last bucket also holds `upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over the finite values. A constant series lands in a
/// single unit-wide bin centred on the value.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min <= 0.0 {
        return vec![Bin {
            lower: min - 0.5,
            upper: min + 0.5,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();
    for v in finite {
        let i = (((v - min) / width) as usize).min(bins - 1);
        out[i].count += 1;
    }
    out
}

fn axes(svg: &mut String, top: f64) {
    let bottom = top + PANEL_HEIGHT - MARGIN_BOTTOM;
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        top + MARGIN_TOP,
        MARGIN_LEFT,
        bottom
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        bottom,
        CHART_WIDTH - MARGIN_RIGHT,
        bottom
    ));
}

fn label(svg: &mut String, x: f64, y: f64, anchor: &str, size: u32, text: &str) {
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"{}\" font-size=\"{}\" fill=\"#666\">{}</text>\n",
        x, y, anchor, size, text
    ));
}

fn equity_panel(svg: &mut String, curve: &[EquityPoint], top: f64) {
    let min = curve.iter().map(|p| p.normalized).fold(1.0, f64::min);
    let max = curve.iter().map(|p| p.normalized).fold(1.0, f64::max);
    let range = (max - min).max(1e-6);

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    // index 0 is the starting equity of 1.0
    let steps = curve.len().max(1) as f64;
    let x_scale = |i: usize| MARGIN_LEFT + (i as f64 / steps) * plot_width;
    let y_scale = |v: f64| top + MARGIN_TOP + plot_height - ((v - min) / range) * plot_height;

    let mut path_data = format!("M {:.1} {:.1}", x_scale(0), y_scale(1.0));
    for (i, point) in curve.iter().enumerate() {
        path_data.push_str(&format!(" L {:.1} {:.1}", x_scale(i + 1), y_scale(point.normalized)));
    }

    label(svg, CHART_WIDTH / 2.0, top + 18.0, "middle", 14, "Equity curve (normalized)");
    axes(svg, top);
    label(svg, MARGIN_LEFT - 5.0, top + MARGIN_TOP + 5.0, "end", 10, &format!("{max:.3}"));
    label(svg, MARGIN_LEFT - 5.0, top + PANEL_HEIGHT - MARGIN_BOTTOM, "end", 10, &format!("{min:.3}"));
    if let (Some(first), Some(last)) = (curve.first(), curve.last()) {
        let baseline = top + PANEL_HEIGHT - MARGIN_BOTTOM + 15.0;
        label(svg, MARGIN_LEFT, baseline, "start", 10, &first.session_date.to_string());
        label(svg, CHART_WIDTH - MARGIN_RIGHT, baseline, "end", 10, &last.session_date.to_string());
    }
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"#2563eb\" stroke-width=\"2\"/>\n",
        path_data
    ));
}

fn histogram_panel(svg: &mut String, bins: &[Bin], top: f64) {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
    let bar_width = plot_width / bins.len().max(1) as f64;
    let bottom = top + PANEL_HEIGHT - MARGIN_BOTTOM;

    label(svg, CHART_WIDTH / 2.0, top + 18.0, "middle", 14, "Trade return distribution (%)");
    axes(svg, top);
    label(svg, MARGIN_LEFT - 5.0, top + MARGIN_TOP + 5.0, "end", 10, &format!("{max_count:.0}"));
    for (i, bin) in bins.iter().enumerate() {
        let h = bin.count as f64 / max_count * plot_height;
        svg.push_str(&format!(
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#16a34a\" stroke=\"white\"/>\n",
            MARGIN_LEFT + i as f64 * bar_width,
            bottom - h,
            bar_width,
            h
        ));
    }
    if let (Some(first), Some(last)) = (bins.first(), bins.last()) {
        label(svg, MARGIN_LEFT, bottom + 15.0, "start", 10, &format!("{:.2}", first.lower));
        label(svg, CHART_WIDTH - MARGIN_RIGHT, bottom + 15.0, "end", 10, &format!("{:.2}", last.upper));
    }
}

/// Full report image. Returns an empty string when there is nothing to plot.
pub fn render_report_svg(curve: &[EquityPoint], returns_pct: &[f64]) -> String {
    if curve.is_empty() {
        return String::new();
    }

    let height = PANEL_HEIGHT * 2.0;
    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, height, CHART_WIDTH, height
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    equity_panel(&mut svg, curve, 0.0);
    histogram_panel(&mut svg, &histogram(returns_pct, HISTOGRAM_BINS), PANEL_HEIGHT);
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, normalized: f64) -> EquityPoint {
        EquityPoint {
            session_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            equity: normalized * 100_000.0,
            normalized,
        }
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [-1.0, -0.5, 0.0, 0.25, 1.0, f64::NAN];
        let bins = histogram(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        // max value lands in the last bin
        assert_eq!(bins[3].count, 1);
        assert!((bins[0].lower - (-1.0)).abs() < f64::EPSILON);
        assert!((bins[3].upper - 1.0).abs() < 1e-12);
    }

    #[test]
    fn histogram_of_constant_series() {
        let bins = histogram(&[0.4, 0.4], 30);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
    }

    #[test]
    fn histogram_empty() {
        assert!(histogram(&[], 30).is_empty());
    }

    #[test]
    fn empty_curve_renders_nothing() {
        assert!(render_report_svg(&[], &[]).is_empty());
    }

    #[test]
    fn report_svg_has_both_panels() {
        let curve = vec![point(2, 0.996), point(3, 1.002)];
        let svg = render_report_svg(&curve, &[-0.4, 0.6]);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Equity curve"));
        assert!(svg.contains("Trade return distribution"));
        assert!(svg.contains("<path"));
        assert!(svg.contains("2025-01-03"));
    }
}
