//! Slot-selection policy.

use chrono::NaiveDate;
use slotwatch_core::{AvailableDate, TargetWindow};

/// First date, in the order the portal returned them, that falls inside
/// the window (inclusive on both ends). The portal lists dates ascending,
/// so first match is the earliest usable date; the input is never
/// re-sorted.
pub fn pick(dates: &[AvailableDate], window: &TargetWindow) -> Option<NaiveDate> {
    dates
        .iter()
        .map(|d| d.date)
        .find(|date| window.contains(*date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn dates(values: &[&str]) -> Vec<AvailableDate> {
        values.iter().map(|s| AvailableDate { date: d(s) }).collect()
    }

    fn window(start: &str, end: &str) -> TargetWindow {
        TargetWindow {
            start: d(start),
            end: d(end),
        }
    }

    #[test]
    fn returns_first_match_in_input_order() {
        let ds = dates(&["2025-01-15", "2025-02-10", "2025-02-05"]);
        let w = window("2025-02-01", "2025-02-28");
        // 2025-02-10 comes before 2025-02-05 in the input, so it wins even
        // though it is the later calendar date.
        assert_eq!(pick(&ds, &w), Some(d("2025-02-10")));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = window("2025-02-01", "2025-02-28");
        assert_eq!(
            pick(&dates(&["2025-02-01"]), &w),
            Some(d("2025-02-01"))
        );
        assert_eq!(
            pick(&dates(&["2025-02-28"]), &w),
            Some(d("2025-02-28"))
        );
    }

    #[test]
    fn no_match_yields_none() {
        let ds = dates(&["2025-03-01", "2025-04-01"]);
        let w = window("2025-02-01", "2025-02-28");
        assert_eq!(pick(&ds, &w), None);
    }

    #[test]
    fn empty_sequence_yields_none() {
        let w = window("2025-02-01", "2025-02-28");
        assert_eq!(pick(&[], &w), None);
    }
}
