/// Date-window partitioning for bounded remote queries.
///
/// One mgraph request covers one window. Width is a tunable parameter that
/// bounds response payload size and keeps the request rate civil, so the
/// partitioner never assumes a particular width.

use chrono::{Duration, NaiveDate};
use std::fmt;

/// An inclusive `[date_from, date_to]` range bounding one remote query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl Window {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.date_from && date <= self.date_to
    }

    /// Number of calendar days covered, inclusive of both endpoints.
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.date_from, self.date_to)
    }
}

/// Splits `[from, to]` into contiguous, non-overlapping windows of
/// `width_days` each, with the final window clipped to `to`.
///
/// A width of zero is treated as one day. An inverted range yields no
/// windows.
pub fn partition(from: NaiveDate, to: NaiveDate, width_days: u32) -> Vec<Window> {
    let width = i64::from(width_days.max(1));
    let mut windows = Vec::new();

    let mut start = from;
    while start <= to {
        let end = (start + Duration::days(width - 1)).min(to);
        windows.push(Window { date_from: start, date_to: end });
        start = end + Duration::days(1);
    }

    windows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_width_partition_yields_one_window_per_day() {
        let windows = partition(date(2020, 1, 1), date(2020, 1, 5), 1);
        assert_eq!(windows.len(), 5, "five days need five single-day windows");
        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.date_from, w.date_to, "single-day window {}", i);
        }
        assert_eq!(windows[0].date_from, date(2020, 1, 1));
        assert_eq!(windows[4].date_to, date(2020, 1, 5));
    }

    #[test]
    fn test_windows_are_contiguous_with_no_gaps_or_overlap() {
        let windows = partition(date(2019, 1, 1), date(2019, 12, 31), 50);
        for pair in windows.windows(2) {
            assert_eq!(
                pair[1].date_from,
                pair[0].date_to + Duration::days(1),
                "next window must start the day after the previous one ends"
            );
        }
    }

    #[test]
    fn test_final_window_is_clipped_to_end_date() {
        let windows = partition(date(2020, 1, 1), date(2020, 2, 10), 50);
        assert_eq!(windows.len(), 1, "41 days fit inside one 50-day window");
        assert_eq!(windows[0].date_to, date(2020, 2, 10));

        let windows = partition(date(2020, 1, 1), date(2020, 3, 15), 50);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].days(), 50);
        assert_eq!(windows[1].date_from, date(2020, 2, 20));
        assert_eq!(windows[1].date_to, date(2020, 3, 15), "tail clipped to to_date");
    }

    #[test]
    fn test_full_range_is_covered() {
        let from = date(2019, 1, 1);
        let to = date(2019, 4, 15);
        let windows = partition(from, to, 50);

        let covered: i64 = windows.iter().map(Window::days).sum();
        assert_eq!(covered, (to - from).num_days() + 1, "no day lost, no day doubled");
        assert_eq!(windows.first().unwrap().date_from, from);
        assert_eq!(windows.last().unwrap().date_to, to);
    }

    #[test]
    fn test_single_day_range() {
        let windows = partition(date(2020, 6, 1), date(2020, 6, 1), 50);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].days(), 1);
    }

    #[test]
    fn test_inverted_range_yields_no_windows() {
        let windows = partition(date(2020, 6, 2), date(2020, 6, 1), 50);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_zero_width_is_treated_as_one_day() {
        let windows = partition(date(2020, 1, 1), date(2020, 1, 3), 0);
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn test_window_display_format() {
        let w = Window { date_from: date(2020, 1, 1), date_to: date(2020, 2, 19) };
        assert_eq!(w.to_string(), "2020-01-01..2020-02-19");
    }
}
