// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar-day math.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use std::time::Duration;

/// Calendar day of `instant` in the device's local time zone.
pub fn local_day(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// Weekday index with Sunday = 0 through Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Render a duration as `MM:SS.cc` (minutes keep counting past 59).
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let centis = elapsed.subsec_millis() / 10;
    format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_index_sunday_is_zero() {
        // 2025-01-05 was a Sunday
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(weekday_index(sunday), 0);
        assert_eq!(weekday_index(sunday.succ_opt().unwrap()), 1);
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert_eq!(weekday_index(saturday), 6);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00.00");
        assert_eq!(format_elapsed(Duration::from_millis(61_234)), "01:01.23");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00.00");
    }
}
