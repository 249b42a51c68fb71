//! Opening-range calculator.
//!
//! For every session, the high/low of the bars whose local time falls in
//! `[range_start, range_end)`. Sessions without such bars get no range, and
//! every bar of that session carries `None`.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::annotated::AnnotatedBar;
use super::session::SessionWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningRange {
    pub session_date: NaiveDate,
    pub high: f64,
    pub low: f64,
}

impl OpeningRange {
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

pub fn compute_opening_ranges(
    bars: &[AnnotatedBar],
    window: &SessionWindow,
) -> BTreeMap<NaiveDate, OpeningRange> {
    let mut ranges: BTreeMap<NaiveDate, OpeningRange> = BTreeMap::new();

    for ab in bars.iter().filter(|ab| window.in_range(ab.local_time)) {
        ranges
            .entry(ab.session_date)
            .and_modify(|r| {
                r.high = r.high.max(ab.bar.high);
                r.low = r.low.min(ab.bar.low);
            })
            .or_insert(OpeningRange {
                session_date: ab.session_date,
                high: ab.bar.high,
                low: ab.bar.low,
            });
    }

    ranges
}

/// Broadcast each session's range onto all of its bars. Returns the number of
/// sessions that have a range.
pub fn attach_opening_ranges(bars: &mut [AnnotatedBar], window: &SessionWindow) -> usize {
    let ranges = compute_opening_ranges(bars, window);
    for ab in bars.iter_mut() {
        ab.opening_range = ranges.get(&ab.session_date).copied();
    }
    ranges.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotated::test_support::{annotated, day};

    fn window() -> SessionWindow {
        SessionWindow::default()
    }

    #[test]
    fn range_uses_only_window_bars() {
        let mut bars = vec![
            annotated(day(2), "09:25", 120.0, 80.0, 100.0),
            annotated(day(2), "09:30", 102.0, 100.0, 101.0),
            annotated(day(2), "09:45", 101.5, 99.5, 100.0),
            annotated(day(2), "10:00", 130.0, 90.0, 100.0),
        ];
        let count = attach_opening_ranges(&mut bars, &window());

        assert_eq!(count, 1);
        for ab in &bars {
            let r = ab.opening_range.unwrap();
            assert_eq!(r.high, 102.0);
            assert_eq!(r.low, 99.5);
        }
    }

    #[test]
    fn bars_at_range_start_included_at_range_end_excluded() {
        let mut first = annotated(day(2), "09:30", 105.0, 100.0, 103.0);
        let mut second = annotated(day(2), "09:30", 104.0, 98.0, 103.0);
        first.bar.timestamp = first.bar.timestamp + chrono::Duration::seconds(10);
        second.bar.timestamp = second.bar.timestamp + chrono::Duration::seconds(40);
        let at_end = annotated(day(2), "10:00", 200.0, 1.0, 100.0);

        let ranges = compute_opening_ranges(&[first, second, at_end], &window());
        let r = ranges[&day(2)];
        assert_eq!(r.high, 105.0);
        assert_eq!(r.low, 98.0);
    }

    #[test]
    fn session_without_window_bars_has_no_range() {
        let mut bars = vec![
            annotated(day(2), "09:35", 102.0, 100.0, 101.0),
            annotated(day(3), "10:30", 110.0, 105.0, 108.0),
            annotated(day(3), "11:00", 111.0, 106.0, 109.0),
        ];
        attach_opening_ranges(&mut bars, &window());

        assert!(bars[0].opening_range.is_some());
        assert!(bars[1].opening_range.is_none());
        assert!(bars[2].opening_range.is_none());
    }

    #[test]
    fn ranges_are_per_session() {
        let bars = vec![
            annotated(day(2), "09:30", 102.0, 100.0, 101.0),
            annotated(day(3), "09:30", 52.0, 50.0, 51.0),
        ];
        let ranges = compute_opening_ranges(&bars, &window());
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[&day(3)].high, 52.0);
        assert_eq!(ranges[&day(2)].midpoint(), 101.0);
    }
}
