//! Nightly sleep window evaluation

use focusward_util::{seconds_of_day, EpochMillis, SECONDS_PER_DAY};

/// A daily interval in local time, possibly wrapping past midnight.
///
/// `start == end` is an empty window, never active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_seconds: u32,
    pub end_seconds: u32,
}

impl TimeWindow {
    pub fn new(start_seconds: u32, end_seconds: u32) -> Self {
        Self {
            start_seconds: start_seconds % SECONDS_PER_DAY,
            end_seconds: end_seconds % SECONDS_PER_DAY,
        }
    }

    /// Whether the window contains the given second of the day
    pub fn contains(&self, second_of_day: u32) -> bool {
        let (start, end) = (self.start_seconds, self.end_seconds);
        if start == end {
            false
        } else if start < end {
            start <= second_of_day && second_of_day < end
        } else {
            second_of_day >= start || second_of_day < end
        }
    }
}

/// Whether `now_ms` falls inside `window`, in local time
pub fn is_in_window(now_ms: EpochMillis, window: &TimeWindow) -> bool {
    seconds_of_day(now_ms).is_some_and(|s| window.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use focusward_util::to_epoch_ms;

    const H: u32 = 3600;

    fn at(h: u32, m: u32, s: u32) -> EpochMillis {
        to_epoch_ms(&Local.with_ymd_and_hms(2025, 3, 12, h, m, s).unwrap())
    }

    #[test]
    fn overnight_window() {
        let window = TimeWindow::new(23 * H, 7 * H);

        assert!(is_in_window(at(23, 0, 0), &window));
        assert!(is_in_window(at(3, 0, 0), &window));
        assert!(is_in_window(at(6, 59, 59), &window));
        assert!(!is_in_window(at(7, 0, 0), &window));
        assert!(!is_in_window(at(12, 0, 0), &window));
        assert!(!is_in_window(at(22, 59, 59), &window));
    }

    #[test]
    fn same_day_window() {
        let window = TimeWindow::new(13 * H, 15 * H);

        assert!(!is_in_window(at(12, 59, 59), &window));
        assert!(is_in_window(at(13, 0, 0), &window));
        assert!(is_in_window(at(14, 30, 0), &window));
        assert!(!is_in_window(at(15, 0, 0), &window));
    }

    #[test]
    fn empty_window_is_never_active() {
        for x in [0, 1, 7 * H, 23 * H, SECONDS_PER_DAY - 1] {
            let window = TimeWindow::new(x, x);
            for s in [0, x, x.saturating_sub(1), (x + 1) % SECONDS_PER_DAY, 12 * H] {
                assert!(!window.contains(s));
            }
        }
    }

    #[test]
    fn midnight_start() {
        let window = TimeWindow::new(0, 6 * H);
        assert!(window.contains(0));
        assert!(!window.contains(SECONDS_PER_DAY - 1));
    }
}
