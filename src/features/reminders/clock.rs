//! # Wall Clock
//!
//! Local wall-clock source and the countdown arithmetic that aligns reminders
//! to it. All arithmetic is on naive local time: no timezone conversion and no
//! daylight-saving adjustment.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use super::plan::IntakeTime;
use chrono::{Duration, Local, NaiveDateTime};
use std::sync::{Arc, Mutex};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Milliseconds from `now` until the next occurrence of `time_of_day`.
///
/// Targets today's occurrence; if that is already in the past (strictly
/// negative interval) it targets tomorrow's instead. An interval of exactly
/// zero is left alone.
pub fn countdown_millis(now: NaiveDateTime, time_of_day: IntakeTime) -> i64 {
    let target = now.date().and_time(time_of_day.as_naive());
    let interval = (target - now).num_milliseconds();
    if interval < 0 {
        interval + MILLIS_PER_DAY
    } else {
        interval
    }
}

/// Wall-clock instant the countdown armed at `now` will target
pub fn next_occurrence(now: NaiveDateTime, time_of_day: IntakeTime) -> NaiveDateTime {
    now + Duration::milliseconds(countdown_millis(now, time_of_day))
}

/// The occurrence one day after `previous`, rolled forward by whole days until
/// it is no earlier than `now` (e.g. after the host slept through several days)
pub fn following_occurrence(previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    let mut next = previous + Duration::days(1);
    while next < now {
        next += Duration::days(1);
    }
    next
}

/// Non-negative delay from `now` until `target`
pub fn delay_until(now: NaiveDateTime, target: NaiveDateTime) -> std::time::Duration {
    let millis = (target - now).num_milliseconds().max(0);
    std::time::Duration::from_millis(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(s: &str) -> IntakeTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_later_today() {
        assert_eq!(countdown_millis(at(7, 0, 0), time("08:00:00")), 3_600_000);
    }

    #[test]
    fn test_already_passed_rolls_to_tomorrow() {
        assert_eq!(countdown_millis(at(9, 0, 0), time("08:00:00")), 82_800_000);
        assert_eq!(
            countdown_millis(at(9, 0, 0), time("08:00:00")),
            MILLIS_PER_DAY - 3_600_000
        );
    }

    #[test]
    fn test_exact_match_is_not_bumped() {
        assert_eq!(countdown_millis(at(8, 0, 0), time("08:00:00")), 0);
        assert_eq!(next_occurrence(at(8, 0, 0), time("08:00:00")), at(8, 0, 0));
    }

    #[test]
    fn test_one_millisecond_late_waits_almost_a_day() {
        let now = at(8, 0, 0) + Duration::milliseconds(1);
        assert_eq!(countdown_millis(now, time("08:00:00")), MILLIS_PER_DAY - 1);
    }

    #[test]
    fn test_midnight_edges() {
        assert_eq!(countdown_millis(at(23, 59, 59), time("00:00:00")), 1_000);
        assert_eq!(countdown_millis(at(0, 0, 0), time("23:59:59")), MILLIS_PER_DAY - 1_000);
    }

    #[test]
    fn test_interval_is_never_negative() {
        for hour in 0..24 {
            for target in ["00:00:00", "06:30:00", "12:00:00", "23:59:59"] {
                let interval = countdown_millis(at(hour, 17, 3), time(target));
                assert!((0..MILLIS_PER_DAY).contains(&interval));
            }
        }
    }

    #[test]
    fn test_next_occurrence_crosses_midnight() {
        let next = next_occurrence(at(22, 0, 0), time("06:00:00"));
        assert_eq!(next, at(6, 0, 0) + Duration::days(1));
    }

    #[test]
    fn test_following_occurrence() {
        assert_eq!(
            following_occurrence(at(8, 0, 0), at(8, 0, 10)),
            at(8, 0, 0) + Duration::days(1)
        );
        // host asleep for three days
        let now = at(9, 0, 0) + Duration::days(3);
        assert_eq!(following_occurrence(at(8, 0, 0), now), at(8, 0, 0) + Duration::days(4));
    }

    #[test]
    fn test_delay_until_clamps_past_targets() {
        assert_eq!(delay_until(at(9, 0, 0), at(8, 0, 0)), std::time::Duration::ZERO);
        assert_eq!(
            delay_until(at(8, 0, 0), at(8, 0, 1)),
            std::time::Duration::from_secs(1)
        );
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(at(7, 0, 0));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), at(8, 30, 0));
        clock.set(at(1, 0, 0));
        assert_eq!(clock.now(), at(1, 0, 0));
    }
}
