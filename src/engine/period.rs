use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Raised when a time-of-day string is neither "HH:MM" nor "HH:MM:SS".
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time of day {0:?}, expected HH:MM or HH:MM:SS")]
pub struct InvalidTimeFormat(pub String);

/// Parse a wall-clock time string. Only the two shapes "HH:MM" and
/// "HH:MM:SS" are accepted; everything else is a boundary validation error.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, InvalidTimeFormat> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| InvalidTimeFormat(value.to_string()))
}

/// Combine a calendar date with a "HH:MM"/"HH:MM:SS" string into a timestamp.
pub fn build_timestamp(date: NaiveDate, time: &str) -> Result<NaiveDateTime, InvalidTimeFormat> {
    Ok(date.and_time(parse_time_of_day(time)?))
}

/// Build the (start, end) period anchored at `date`. When `end <= start` the
/// end lands on the next calendar day. This is the single crossing-midnight
/// rule; work windows, break windows and the night window all go through here.
pub fn period_from_time_range(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let start_at = date.and_time(start);
    let mut end_at = date.and_time(end);

    if end_at <= start_at {
        end_at += Duration::days(1);
    }

    (start_at, end_at)
}

/// Minutes shared by two periods, zero when they do not intersect.
pub fn overlap_minutes(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> i64 {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);

    if end > start { (end - start).num_minutes() } else { 0 }
}

/// Truncate a minute count down to the rounding unit. Partial units are
/// never paid out, so this floors rather than rounds to nearest.
pub fn floor_to_unit(minutes: i64, unit: i32) -> i64 {
    let unit = i64::from(unit.max(1));
    (minutes.max(0) / unit) * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_both_accepted_shapes() {
        assert_eq!(parse_time_of_day("09:00"), Ok(t(9, 0)));
        assert_eq!(parse_time_of_day("22:15:30"), Ok(NaiveTime::from_hms_opt(22, 15, 30).unwrap()));
    }

    #[test]
    fn rejects_malformed_time_strings() {
        for bad in ["", "9am", "25:00", "12:60", "12-30", "12:30:30:30"] {
            assert_eq!(parse_time_of_day(bad), Err(InvalidTimeFormat(bad.to_string())));
        }
    }

    #[test]
    fn builds_timestamp_on_the_given_date() {
        let at = build_timestamp(d(2026, 2, 10), "09:30").unwrap();
        assert_eq!(at, d(2026, 2, 10).and_time(t(9, 30)));
    }

    #[test]
    fn period_stays_on_one_day_when_end_after_start() {
        let (start, end) = period_from_time_range(d(2026, 2, 10), t(9, 0), t(18, 0));
        assert_eq!(start, d(2026, 2, 10).and_time(t(9, 0)));
        assert_eq!(end, d(2026, 2, 10).and_time(t(18, 0)));
    }

    #[test]
    fn period_crosses_midnight_when_end_not_after_start() {
        let (start, end) = period_from_time_range(d(2026, 2, 10), t(22, 0), t(6, 0));
        assert_eq!(start, d(2026, 2, 10).and_time(t(22, 0)));
        assert_eq!(end, d(2026, 2, 11).and_time(t(6, 0)));

        // Equal boundaries count as crossing too, giving a full 24h period.
        let (start, end) = period_from_time_range(d(2026, 2, 10), t(9, 0), t(9, 0));
        assert_eq!((end - start).num_minutes(), 24 * 60);
    }

    #[test]
    fn overlap_is_zero_for_disjoint_periods() {
        let a = (d(2026, 2, 10).and_time(t(9, 0)), d(2026, 2, 10).and_time(t(12, 0)));
        let b = (d(2026, 2, 10).and_time(t(13, 0)), d(2026, 2, 10).and_time(t(14, 0)));
        assert_eq!(overlap_minutes(a.0, a.1, b.0, b.1), 0);
        // Touching boundaries share no minutes.
        let c = (d(2026, 2, 10).and_time(t(12, 0)), d(2026, 2, 10).and_time(t(13, 0)));
        assert_eq!(overlap_minutes(a.0, a.1, c.0, c.1), 0);
    }

    #[test]
    fn overlap_counts_the_shared_minutes() {
        let a = (d(2026, 2, 10).and_time(t(9, 0)), d(2026, 2, 10).and_time(t(13, 0)));
        let b = (d(2026, 2, 10).and_time(t(12, 0)), d(2026, 2, 10).and_time(t(14, 0)));
        assert_eq!(overlap_minutes(a.0, a.1, b.0, b.1), 60);
    }

    #[test]
    fn floor_truncates_and_never_rounds_up() {
        assert_eq!(floor_to_unit(487, 15), 480);
        assert_eq!(floor_to_unit(47, 10), 40);
        assert_eq!(floor_to_unit(9, 10), 0);
        assert_eq!(floor_to_unit(60, 15), 60);
    }

    #[test]
    fn floor_guards_degenerate_inputs() {
        assert_eq!(floor_to_unit(-30, 10), 0);
        assert_eq!(floor_to_unit(37, 0), 37);
        assert_eq!(floor_to_unit(37, -5), 37);
    }
}
