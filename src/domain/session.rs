//! Session calendar: local wall-clock times and session dates in the
//! configured timezone.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// Minute-of-day wall-clock time, compared the way `HH:MM` strings compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTime(u16);

impl LocalTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<LocalTime> {
        if hour < 24 && minute < 60 {
            Some(LocalTime((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn minute_of_day(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected HH:MM, got {0:?}")]
pub struct LocalTimeParseError(String);

impl FromStr for LocalTime {
    type Err = LocalTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LocalTimeParseError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(err());
        }
        let hour: u32 = h.parse().map_err(|_| err())?;
        let minute: u32 = m.parse().map_err(|_| err())?;
        LocalTime::from_hm(hour, minute).ok_or_else(err)
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Session date and truncated wall-clock time of an instant in `tz`.
pub fn local_parts(timestamp: DateTime<Utc>, tz: Tz) -> (NaiveDate, LocalTime) {
    let local = timestamp.with_timezone(&tz);
    let time = LocalTime((local.hour() * 60 + local.minute()) as u16);
    (local.date_naive(), time)
}

/// Opening-range window `[range_start, range_end)` plus the last local time
/// at which an open position may still be managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub range_start: LocalTime,
    pub range_end: LocalTime,
    pub session_end: LocalTime,
}

impl SessionWindow {
    pub fn in_range(&self, time: LocalTime) -> bool {
        time >= self.range_start && time < self.range_end
    }

    pub fn after_range(&self, time: LocalTime) -> bool {
        time >= self.range_end
    }

    pub fn before_close(&self, time: LocalTime) -> bool {
        time <= self.session_end
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        SessionWindow {
            range_start: LocalTime(9 * 60 + 30),
            range_end: LocalTime(10 * 60),
            session_end: LocalTime(16 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn t(s: &str) -> LocalTime {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display_round_trip() {
        assert_eq!(t("09:30").minute_of_day(), 570);
        assert_eq!(t("16:00").to_string(), "16:00");
        assert_eq!(t(" 00:05 ").to_string(), "00:05");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["9:30", "0930", "24:00", "12:60", "ab:cd", ""] {
            assert!(bad.parse::<LocalTime>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn ordering_matches_string_ordering() {
        assert!(t("09:59") < t("10:00"));
        assert!(t("10:00") <= t("10:00"));
        assert!(t("15:55") < t("16:00"));
    }

    #[test]
    fn local_parts_in_winter() {
        // 14:30Z is 09:30 EST
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 45).unwrap();
        let (date, time) = local_parts(ts, New_York);
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(time, t("09:30"));
    }

    #[test]
    fn local_parts_in_summer() {
        // 13:30Z is 09:30 EDT
        let ts = Utc.with_ymd_and_hms(2025, 7, 1, 13, 30, 0).unwrap();
        assert_eq!(local_parts(ts, New_York).1, t("09:30"));
    }

    #[test]
    fn local_date_can_differ_from_utc_date() {
        // 02:00Z on Jan 3 is still Jan 2 in New York
        let ts = Utc.with_ymd_and_hms(2025, 1, 3, 2, 0, 0).unwrap();
        let (date, time) = local_parts(ts, New_York);
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(time, t("21:00"));
    }

    #[test]
    fn window_boundaries() {
        let w = SessionWindow::default();
        assert!(w.in_range(t("09:30")));
        assert!(w.in_range(t("09:59")));
        assert!(!w.in_range(t("10:00")));
        assert!(!w.in_range(t("09:29")));
        assert!(w.after_range(t("10:00")));
        assert!(!w.after_range(t("09:55")));
        assert!(w.before_close(t("16:00")));
        assert!(!w.before_close(t("16:05")));
    }
}
