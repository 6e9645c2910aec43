//! Time arithmetic helpers — pure functions, no state.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use rand::Rng;

use dripline_core::error::{DriplineError, Result};
use dripline_core::types::{ActiveHours, DelayUnit, JitterRange, JitterUnit};

/// Shift a timestamp by an integer amount of the given unit. All arithmetic
/// stays in UTC instants; no timezone conversion happens anywhere.
pub fn add_duration(t: DateTime<Utc>, value: i64, unit: DelayUnit) -> DateTime<Utc> {
    match unit {
        DelayUnit::Minutes => t + Duration::minutes(value),
        DelayUnit::Hours => t + Duration::hours(value),
        DelayUnit::Days => t + Duration::days(value),
    }
}

/// Uniform random jitter in minutes, drawn from `[min, max]` inclusive.
/// Second-unit ranges divide by 60 without rounding — fractional minutes
/// are a legitimate intermediate value until applied to a timestamp.
pub fn jitter_minutes(range: &JitterRange) -> f64 {
    let (min, max) = if range.min <= range.max {
        (range.min, range.max)
    } else {
        (range.max, range.min)
    };
    let raw = rand::thread_rng().gen_range(min..=max) as f64;
    match range.unit {
        JitterUnit::Seconds => raw / 60.0,
        JitterUnit::Minutes => raw,
    }
}

/// Apply a possibly-fractional minute offset to an integer-second timestamp.
pub fn add_minutes_f64(t: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    t + Duration::seconds((minutes * 60.0).round() as i64)
}

/// Anchor to a calendar slot: UTC midnight of `now`'s day, plus
/// `day_number - 1` days, at `time_of_day`.
pub fn day_anchor(now: DateTime<Utc>, day_number: u32, time_of_day: NaiveTime) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    midnight
        + Duration::days(i64::from(day_number.saturating_sub(1)))
        + Duration::seconds(i64::from(time_of_day.num_seconds_from_midnight()))
}

/// Parse an "HH:MM" time-of-day string.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| DriplineError::config(format!("bad time-of-day '{s}': {e}")))
}

/// Whether `t`'s time-of-day falls inside an active-hours window.
/// Windows with `start > end` wrap past midnight (e.g. 20:00–06:00).
pub fn within_active_hours(window: &ActiveHours, t: DateTime<Utc>) -> Result<bool> {
    let start = parse_hhmm(&window.start)?;
    let end = parse_hhmm(&window.end)?;
    let tod = t.time();
    Ok(if start <= end {
        tod >= start && tod < end
    } else {
        tod >= start || tod < end
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, h, m, 0).unwrap()
    }

    #[test]
    fn test_add_duration_units() {
        let t = at(12, 0);
        assert_eq!(add_duration(t, 30, DelayUnit::Minutes), at(12, 30));
        assert_eq!(add_duration(t, 2, DelayUnit::Hours), at(14, 0));
        assert_eq!(
            add_duration(t, 3, DelayUnit::Days),
            Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_jitter_bounds_minutes() {
        let range = JitterRange { min: 2, max: 5, unit: JitterUnit::Minutes };
        for _ in 0..200 {
            let j = jitter_minutes(&range);
            assert!((2.0..=5.0).contains(&j), "jitter {j} out of bounds");
        }
    }

    #[test]
    fn test_jitter_bounds_seconds_fractional() {
        let range = JitterRange { min: 30, max: 90, unit: JitterUnit::Seconds };
        for _ in 0..200 {
            let j = jitter_minutes(&range);
            assert!((0.5..=1.5).contains(&j), "jitter {j} out of bounds");
        }
    }

    #[test]
    fn test_jitter_degenerate_range() {
        let range = JitterRange { min: 3, max: 3, unit: JitterUnit::Minutes };
        assert_eq!(jitter_minutes(&range), 3.0);
    }

    #[test]
    fn test_add_fractional_minutes() {
        let t = at(12, 0);
        // 1.5 minutes = exactly 90 seconds
        assert_eq!(add_minutes_f64(t, 1.5), t + Duration::seconds(90));
    }

    #[test]
    fn test_day_anchor() {
        let now = at(15, 42);
        let anchored = day_anchor(now, 2, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(anchored, Utc.with_ymd_and_hms(2026, 8, 8, 9, 0, 0).unwrap());

        // Day 1 anchors to today
        let same_day = day_anchor(now, 1, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(same_day, Utc.with_ymd_and_hms(2026, 8, 7, 18, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(parse_hhmm("9am").is_err());
        assert!(parse_hhmm("25:00").is_err());
    }

    #[test]
    fn test_active_hours_plain_window() {
        let w = ActiveHours { start: "08:00".into(), end: "20:00".into() };
        assert!(within_active_hours(&w, at(12, 0)).unwrap());
        assert!(!within_active_hours(&w, at(7, 59)).unwrap());
        assert!(!within_active_hours(&w, at(20, 0)).unwrap());
    }

    #[test]
    fn test_active_hours_wraps_midnight() {
        let w = ActiveHours { start: "20:00".into(), end: "06:00".into() };
        assert!(within_active_hours(&w, at(23, 0)).unwrap());
        assert!(within_active_hours(&w, at(3, 0)).unwrap());
        assert!(!within_active_hours(&w, at(12, 0)).unwrap());
    }
}
