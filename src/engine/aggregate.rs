//! Folds a month of attendance rows into per-user summary counters.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::calculator::OvertimePolicy;
use crate::model::attendance::Attendance;
use crate::model::work_rule::WorkRule;

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlySummary {
    pub user_id: u64,
    pub clock_in_days: u32,
    pub clock_out_days: u32,
    /// Days where worked minutes could actually be computed.
    pub worked_days: u32,
    pub worked_minutes_sum: i64,
    pub overtime_minutes_sum: i64,
    pub night_minutes_sum: i64,
    pub late_days: u32,
    pub early_leave_days: u32,
    /// Integer-floor average per worked day; absent when nothing was worked.
    pub worked_minutes_avg: Option<i64>,
}

/// Fold one user's rows, each paired with the rule resolved for its date.
/// Incomplete rows still count toward the clock-in/clock-out day counters.
pub fn summarize(
    user_id: u64,
    rows: &[(Attendance, WorkRule)],
    policy: OvertimePolicy,
) -> MonthlySummary {
    let mut summary = MonthlySummary {
        user_id,
        clock_in_days: 0,
        clock_out_days: 0,
        worked_days: 0,
        worked_minutes_sum: 0,
        overtime_minutes_sum: 0,
        night_minutes_sum: 0,
        late_days: 0,
        early_leave_days: 0,
        worked_minutes_avg: None,
    };

    for (attendance, rule) in rows {
        if attendance.clock_in.is_some() {
            summary.clock_in_days += 1;
        }
        if attendance.clock_out.is_some() {
            summary.clock_out_days += 1;
        }
        if attendance.is_late {
            summary.late_days += 1;
        }
        if attendance.is_early_leave {
            summary.early_leave_days += 1;
        }

        if let Some(worked) = attendance.worked_minutes_for_rule(rule) {
            summary.worked_days += 1;
            summary.worked_minutes_sum += worked;
        }
        if let Some(overtime) = attendance.overtime_minutes_with_policy(rule, policy) {
            summary.overtime_minutes_sum += overtime;
        }
        if let Some(night) = attendance.night_minutes_for_rule(rule) {
            summary.night_minutes_sum += night;
        }
    }

    if summary.worked_days > 0 {
        summary.worked_minutes_avg =
            Some(summary.worked_minutes_sum / i64::from(summary.worked_days));
    }

    summary
}

/// First and last day of a "YYYY-MM" month, or `None` for a malformed value.
pub fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").ok()?;

    let next_first = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };

    Some((first, next_first.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day_rule() -> WorkRule {
        WorkRule {
            id: 1,
            name: "regular".into(),
            work_start: Some(t(9, 0)),
            work_end: Some(t(18, 0)),
            break_start: Some(t(12, 0)),
            break_end: Some(t(13, 0)),
            rounding_unit_minutes: 15,
        }
    }

    fn row(date: &str, clock_in: Option<(u32, u32)>, clock_out: Option<(u32, u32)>) -> Attendance {
        let work_date: NaiveDate = date.parse().unwrap();
        Attendance {
            id: 0,
            user_id: 7,
            work_date,
            clock_in: clock_in.map(|(h, m)| work_date.and_time(t(h, m))),
            clock_out: clock_out.map(|(h, m)| work_date.and_time(t(h, m))),
            note: None,
            is_late: false,
            is_early_leave: false,
        }
    }

    #[test]
    fn incomplete_days_count_stamps_but_not_work() {
        let rows = vec![
            (row("2026-02-02", Some((9, 0)), Some((18, 0))), day_rule()),
            (row("2026-02-03", Some((9, 0)), None), day_rule()),
        ];

        let s = summarize(7, &rows, OvertimePolicy::ScheduledOver);

        assert_eq!(s.clock_in_days, 2);
        assert_eq!(s.clock_out_days, 1);
        assert_eq!(s.worked_days, 1);
        assert_eq!(s.worked_minutes_sum, 480);
        assert_eq!(s.worked_minutes_avg, Some(480));
    }

    #[test]
    fn average_is_integer_floor_over_worked_days() {
        let rows = vec![
            (row("2026-02-02", Some((9, 0)), Some((18, 0))), day_rule()),
            (row("2026-02-03", Some((9, 0)), Some((14, 0))), day_rule()),
        ];

        let s = summarize(7, &rows, OvertimePolicy::ScheduledOver);

        // 480 + 240 = 720 over two days.
        assert_eq!(s.worked_minutes_sum, 720);
        assert_eq!(s.worked_minutes_avg, Some(360));
    }

    #[test]
    fn empty_month_has_no_average() {
        let s = summarize(7, &[], OvertimePolicy::ScheduledOver);
        assert_eq!(s.worked_days, 0);
        assert_eq!(s.worked_minutes_avg, None);
    }

    #[test]
    fn overtime_and_flags_accumulate() {
        let mut late_row = row("2026-02-02", Some((9, 30)), Some((20, 0)));
        late_row.update_late_early_flags(&day_rule());

        let rows = vec![(late_row, day_rule())];
        let s = summarize(7, &rows, OvertimePolicy::ScheduledOver);

        assert_eq!(s.late_days, 1);
        assert_eq!(s.early_leave_days, 0);
        assert_eq!(s.overtime_minutes_sum, 120);
        assert_eq!(s.night_minutes_sum, 0);
    }

    #[test]
    fn month_bounds_handle_year_wrap_and_leap_february() {
        assert_eq!(
            month_bounds("2026-12"),
            Some(("2026-12-01".parse().unwrap(), "2026-12-31".parse().unwrap()))
        );
        assert_eq!(
            month_bounds("2028-02"),
            Some(("2028-02-01".parse().unwrap(), "2028-02-29".parse().unwrap()))
        );
        assert_eq!(month_bounds("2026-13"), None);
        assert_eq!(month_bounds("not-a-month"), None);
    }
}
