//! Derived-minute computations for one attendance row under a work rule.
//!
//! Everything here is a pure function of `(Attendance, WorkRule)`. A result
//! of `None` means "cannot be computed" (a stamp or schedule boundary is
//! missing) and is distinct from a computed zero.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::engine::period::{floor_to_unit, overlap_minutes, period_from_time_range};
use crate::model::attendance::Attendance;
use crate::model::work_rule::WorkRule;

/// Statutory daily threshold used by the `legal_over` policy.
const LEGAL_DAILY_MINUTES: i64 = 480;

/// How overtime is measured for reporting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OvertimePolicy {
    /// Time past the scheduled end of the shift (the default).
    #[default]
    ScheduledOver,
    /// Time past the fixed 8-hour statutory threshold, schedule-independent.
    LegalOver,
}

impl Attendance {
    /// The shift actually worked, present only when both stamps exist.
    /// A clock-out at or before the clock-in ends on the next calendar day.
    pub fn actual_period(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.clock_in?;
        let mut end = self.clock_out?;

        if end <= start {
            end += Duration::days(1);
        }

        Some((start, end))
    }

    /// Minutes credited as regular labor: the actual period clamped to the
    /// scheduled window, net of break overlap, floored to the rounding unit.
    /// Early arrival and late departure never inflate this figure.
    pub fn worked_minutes_for_rule(&self, rule: &WorkRule) -> Option<i64> {
        let (actual_start, actual_end) = self.actual_period()?;
        let (work_start, work_end) = rule.work_window()?;

        let (sched_start, sched_end) = period_from_time_range(self.work_date, work_start, work_end);

        let start = actual_start.max(sched_start);
        let end = actual_end.min(sched_end);
        if end <= start {
            return Some(0);
        }

        let mut worked = (end - start).num_minutes();
        if let Some((break_start, break_end)) = self.break_period(rule, sched_start) {
            worked -= overlap_minutes(start, end, break_start, break_end);
        }

        Some(floor_to_unit(worked, rule.rounding_unit_minutes))
    }

    /// Length of the scheduled window net of its break, unrounded. This is a
    /// policy constant of the rule, not a measured quantity.
    pub fn scheduled_minutes_for_rule(&self, rule: &WorkRule) -> Option<i64> {
        let (work_start, work_end) = rule.work_window()?;

        let (sched_start, sched_end) = period_from_time_range(self.work_date, work_start, work_end);

        let mut total = (sched_end - sched_start).num_minutes();
        if let Some((break_start, break_end)) = self.break_period(rule, sched_start) {
            total -= overlap_minutes(sched_start, sched_end, break_start, break_end);
        }

        Some(total.max(0))
    }

    /// Minutes strictly after the scheduled end, net of any break falling in
    /// that span, floored to the rounding unit.
    pub fn overtime_minutes_for_rule(&self, rule: &WorkRule) -> Option<i64> {
        let clock_out = self.clock_out?;
        let (work_start, work_end) = rule.work_window()?;

        let (sched_start, sched_end) = period_from_time_range(self.work_date, work_start, work_end);

        // Day-crossing normalization needs both stamps; with only a
        // clock-out the raw stamp is the best available end.
        let actual_end = self.actual_period().map(|(_, end)| end).unwrap_or(clock_out);
        if actual_end <= sched_end {
            return Some(0);
        }

        let mut over = (actual_end - sched_end).num_minutes();
        if let Some((break_start, break_end)) = self.break_period(rule, sched_start) {
            over -= overlap_minutes(sched_end, actual_end, break_start, break_end);
        }

        Some(floor_to_unit(over, rule.rounding_unit_minutes))
    }

    /// Minutes overlapping the fixed 22:00-05:00 night window, from the
    /// unclamped actual period. Night pay accrues whether or not the time
    /// falls inside the nominal schedule.
    pub fn night_minutes_for_rule(&self, rule: &WorkRule) -> Option<i64> {
        let (actual_start, actual_end) = self.actual_period()?;

        let night_start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let night_end = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        let (night_start, night_end) =
            period_from_time_range(self.work_date, night_start, night_end);

        let minutes = overlap_minutes(actual_start, actual_end, night_start, night_end);

        Some(floor_to_unit(minutes, rule.rounding_unit_minutes))
    }

    /// Worked plus overtime. Absent only when both terms are absent;
    /// otherwise a missing term counts as zero.
    pub fn total_minutes_for_rule(&self, rule: &WorkRule) -> Option<i64> {
        let worked = self.worked_minutes_for_rule(rule);
        let overtime = self.overtime_minutes_for_rule(rule);

        match (worked, overtime) {
            (None, None) => None,
            (w, o) => Some(w.unwrap_or(0) + o.unwrap_or(0)),
        }
    }

    pub fn overtime_minutes_with_policy(
        &self,
        rule: &WorkRule,
        policy: OvertimePolicy,
    ) -> Option<i64> {
        match policy {
            OvertimePolicy::ScheduledOver => self.overtime_minutes_for_rule(rule),
            OvertimePolicy::LegalOver => self
                .total_minutes_for_rule(rule)
                .map(|total| (total - LEGAL_DAILY_MINUTES).max(0)),
        }
    }

    /// Recompute the cached late/early-leave flags from the raw stamps
    /// against the scheduled window. No-op when any input is missing; the
    /// caller persists the row.
    pub fn update_late_early_flags(&mut self, rule: &WorkRule) {
        let (Some(clock_in), Some(clock_out)) = (self.clock_in, self.clock_out) else {
            return;
        };
        let Some((work_start, work_end)) = rule.work_window() else {
            return;
        };

        let (sched_start, sched_end) = period_from_time_range(self.work_date, work_start, work_end);

        self.is_late = clock_in > sched_start;
        self.is_early_leave = clock_out < sched_end;
    }

    /// The rule's break anchored at the work date. A break that would end
    /// before the shift starts belongs to the next calendar day (night
    /// shifts with an early-morning break).
    fn break_period(
        &self,
        rule: &WorkRule,
        sched_start: NaiveDateTime,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let (break_start, break_end) = rule.break_window()?;

        let (mut start, mut end) = period_from_time_range(self.work_date, break_start, break_end);
        if end <= sched_start {
            start += Duration::days(1);
            end += Duration::days(1);
        }

        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(
        work: Option<(u32, u32, u32, u32)>,
        brk: Option<(u32, u32, u32, u32)>,
        unit: i32,
    ) -> WorkRule {
        WorkRule {
            id: 1,
            name: "regular".into(),
            work_start: work.map(|(h, m, _, _)| t(h, m)),
            work_end: work.map(|(_, _, h, m)| t(h, m)),
            break_start: brk.map(|(h, m, _, _)| t(h, m)),
            break_end: brk.map(|(_, _, h, m)| t(h, m)),
            rounding_unit_minutes: unit,
        }
    }

    fn attendance(clock_in: Option<(u32, u32)>, clock_out: Option<(u32, u32)>) -> Attendance {
        Attendance {
            id: 1,
            user_id: 1,
            work_date: date(),
            clock_in: clock_in.map(|(h, m)| date().and_time(t(h, m))),
            clock_out: clock_out.map(|(h, m)| date().and_time(t(h, m))),
            note: None,
            is_late: false,
            is_early_leave: false,
        }
    }

    fn day_rule() -> WorkRule {
        rule(Some((9, 0, 18, 0)), Some((12, 0, 13, 0)), 15)
    }

    #[test]
    fn on_time_day_yields_eight_hours_and_no_extras() {
        let a = attendance(Some((9, 0)), Some((18, 0)));
        let r = day_rule();

        assert_eq!(a.worked_minutes_for_rule(&r), Some(480));
        assert_eq!(a.overtime_minutes_for_rule(&r), Some(0));
        assert_eq!(a.night_minutes_for_rule(&r), Some(0));
        assert_eq!(a.total_minutes_for_rule(&r), Some(480));
    }

    #[test]
    fn early_arrival_is_clamped_to_the_scheduled_start() {
        let a = attendance(Some((8, 30)), Some((18, 0)));
        assert_eq!(a.worked_minutes_for_rule(&day_rule()), Some(480));
    }

    #[test]
    fn late_departure_is_excluded_from_worked_minutes() {
        let a = attendance(Some((9, 0)), Some((18, 47)));
        assert_eq!(a.worked_minutes_for_rule(&day_rule()), Some(480));
    }

    #[test]
    fn overtime_floors_to_the_rounding_unit() {
        let a = attendance(Some((9, 0)), Some((18, 47)));
        let r = rule(Some((9, 0, 18, 0)), Some((12, 0, 13, 0)), 10);

        // 47 raw minutes past 18:00 pay out as 40, not 50.
        assert_eq!(a.overtime_minutes_for_rule(&r), Some(40));
    }

    #[test]
    fn worked_minutes_floor_never_round_to_nearest() {
        // 09:53-18:00 with no break is a raw 487 minutes.
        let a = attendance(Some((9, 53)), Some((18, 0)));
        let r = rule(Some((9, 0, 18, 0)), None, 15);

        assert_eq!(a.worked_minutes_for_rule(&r), Some(480));
    }

    #[test]
    fn crossing_midnight_shift_credits_the_night_rule() {
        // Clock-out recorded as 06:00 on the same calendar day; the period
        // normalization reads it as the next morning.
        let a = attendance(Some((22, 0)), Some((6, 0)));
        let r = rule(Some((22, 0, 6, 0)), Some((2, 0, 3, 0)), 15);

        assert_eq!(a.worked_minutes_for_rule(&r), Some(420));
        assert_eq!(a.scheduled_minutes_for_rule(&r), Some(420));
        assert_eq!(a.overtime_minutes_for_rule(&r), Some(0));
    }

    #[test]
    fn night_minutes_span_the_fixed_window() {
        let a = attendance(Some((22, 0)), Some((6, 0)));
        let r = rule(Some((22, 0, 6, 0)), Some((2, 0, 3, 0)), 15);

        // 22:00-05:00 overlap is the full seven hours, unclamped.
        assert_eq!(a.night_minutes_for_rule(&r), Some(420));
    }

    #[test]
    fn night_minutes_ignore_the_scheduled_window() {
        // A day-shift rule with a stay into the evening still earns night
        // minutes for everything past 22:00.
        let a = attendance(Some((9, 0)), Some((23, 30)));
        let r = rule(Some((9, 0, 18, 0)), None, 10);

        assert_eq!(a.night_minutes_for_rule(&r), Some(90));
    }

    #[test]
    fn missing_clock_out_leaves_everything_undefined() {
        let a = attendance(Some((9, 0)), None);
        let r = day_rule();

        assert_eq!(a.actual_period(), None);
        assert_eq!(a.worked_minutes_for_rule(&r), None);
        assert_eq!(a.overtime_minutes_for_rule(&r), None);
        assert_eq!(a.night_minutes_for_rule(&r), None);
        assert_eq!(a.total_minutes_for_rule(&r), None);
    }

    #[test]
    fn rule_without_schedule_leaves_worked_undefined() {
        let a = attendance(Some((9, 0)), Some((18, 0)));
        let r = rule(None, None, 10);

        assert_eq!(a.worked_minutes_for_rule(&r), None);
        assert_eq!(a.scheduled_minutes_for_rule(&r), None);
        assert_eq!(a.overtime_minutes_for_rule(&r), None);
        // Night minutes only need the stamps.
        assert_eq!(a.night_minutes_for_rule(&r), Some(0));
    }

    #[test]
    fn scheduled_minutes_are_not_rounded() {
        let a = attendance(None, None);
        let r = rule(Some((9, 0, 17, 37)), None, 15);

        assert_eq!(a.scheduled_minutes_for_rule(&r), Some(517));
    }

    #[test]
    fn legal_policy_measures_past_the_statutory_threshold() {
        let a = attendance(Some((9, 0)), Some((20, 0)));
        let r = rule(Some((9, 0, 18, 0)), Some((12, 0, 13, 0)), 10);

        // Worked 480 + overtime 120 = 600 total.
        assert_eq!(a.total_minutes_for_rule(&r), Some(600));
        assert_eq!(
            a.overtime_minutes_with_policy(&r, OvertimePolicy::LegalOver),
            Some(120)
        );
        assert_eq!(
            a.overtime_minutes_with_policy(&r, OvertimePolicy::ScheduledOver),
            a.overtime_minutes_for_rule(&r)
        );
    }

    #[test]
    fn legal_policy_never_goes_negative() {
        let a = attendance(Some((9, 0)), Some((15, 0)));
        let r = rule(Some((9, 0, 18, 0)), Some((12, 0, 13, 0)), 10);

        assert_eq!(
            a.overtime_minutes_with_policy(&r, OvertimePolicy::LegalOver),
            Some(0)
        );
    }

    #[test]
    fn flags_follow_the_unclamped_stamps() {
        let r = day_rule();

        let mut on_time = attendance(Some((9, 0)), Some((18, 0)));
        on_time.update_late_early_flags(&r);
        assert!(!on_time.is_late);
        assert!(!on_time.is_early_leave);

        let mut late = attendance(Some((9, 10)), Some((17, 50)));
        late.update_late_early_flags(&r);
        assert!(late.is_late);
        assert!(late.is_early_leave);
    }

    #[test]
    fn flags_are_untouched_without_both_stamps() {
        let mut a = attendance(Some((9, 30)), None);
        a.is_late = false;
        a.update_late_early_flags(&day_rule());
        assert!(!a.is_late);
    }

    #[test]
    fn overtime_skips_a_break_inside_the_overtime_span() {
        // Shift ends 18:00, break 19:00-20:00, clocked out 21:00: the hour
        // of break does not count toward overtime.
        let a = attendance(Some((9, 0)), Some((21, 0)));
        let r = rule(Some((9, 0, 18, 0)), Some((19, 0, 20, 0)), 10);

        assert_eq!(a.overtime_minutes_for_rule(&r), Some(120));
    }
}
