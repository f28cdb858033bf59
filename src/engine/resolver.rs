//! Picks the work rule in effect for a user on a given date.
//!
//! Every caller that needs "the rule for this user today" goes through
//! `resolve_rule` so the fallback contract lives in exactly one place.

use chrono::NaiveDate;
use sqlx::MySqlPool;
use thiserror::Error;

use crate::model::schedule_assignment::ScheduleAssignment;
use crate::model::work_rule::WorkRule;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The organization must always carry a default rule; its absence is a
    /// configuration fault, not a per-request condition.
    #[error("no schedule assignment matched and no default work rule exists")]
    NoDefaultRule,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// The history entry covering `date`, if any. Assignments never overlap per
/// user, so the first hit is the only hit.
pub fn assignment_on(
    history: &[ScheduleAssignment],
    date: NaiveDate,
) -> Option<&ScheduleAssignment> {
    history.iter().find(|a| a.is_active_on(date))
}

const RULE_COLUMNS: &str =
    "w.id, w.name, w.work_start, w.work_end, w.break_start, w.break_end, w.rounding_unit_minutes";

/// The work rule effective for `user_id` on `date`: the assigned rule when a
/// history entry covers the date, else the named organization default.
pub async fn resolve_rule(
    pool: &MySqlPool,
    default_rule_name: &str,
    user_id: u64,
    date: NaiveDate,
) -> Result<WorkRule, ResolveError> {
    let sql = format!(
        r#"
        SELECT {RULE_COLUMNS}
        FROM schedule_assignments sa
        JOIN work_rules w ON w.id = sa.work_rule_id
        WHERE sa.user_id = ?
          AND sa.start_date <= ?
          AND (sa.end_date IS NULL OR sa.end_date >= ?)
        "#
    );

    let assigned = sqlx::query_as::<_, WorkRule>(&sql)
        .bind(user_id)
        .bind(date)
        .bind(date)
        .fetch_optional(pool)
        .await?;

    if let Some(rule) = assigned {
        return Ok(rule);
    }

    default_rule(pool, default_rule_name)
        .await?
        .ok_or(ResolveError::NoDefaultRule)
}

/// The organization-wide fallback rule, looked up by its configured name.
pub async fn default_rule(
    pool: &MySqlPool,
    name: &str,
) -> Result<Option<WorkRule>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {RULE_COLUMNS}
        FROM work_rules w
        WHERE w.name = ?
        "#
    );

    sqlx::query_as::<_, WorkRule>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, rule_id: u64, start: &str, end: Option<&str>) -> ScheduleAssignment {
        ScheduleAssignment {
            id,
            user_id: 7,
            work_rule_id: rule_id,
            start_date: start.parse().unwrap(),
            end_date: end.map(|e| e.parse().unwrap()),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn picks_the_entry_containing_the_date() {
        let history = vec![
            entry(1, 10, "2026-01-01", Some("2026-01-31")),
            entry(2, 20, "2026-02-01", Some("2026-02-28")),
            entry(3, 30, "2026-03-01", None),
        ];

        assert_eq!(assignment_on(&history, day("2026-01-15")).unwrap().work_rule_id, 10);
        assert_eq!(assignment_on(&history, day("2026-02-28")).unwrap().work_rule_id, 20);
        assert_eq!(assignment_on(&history, day("2026-06-01")).unwrap().work_rule_id, 30);
    }

    #[test]
    fn dates_before_any_entry_match_nothing() {
        let history = vec![entry(1, 10, "2026-02-01", None)];
        assert!(assignment_on(&history, day("2026-01-31")).is_none());
    }

    #[test]
    fn gaps_between_entries_match_nothing() {
        let history = vec![
            entry(1, 10, "2026-01-01", Some("2026-01-31")),
            entry(2, 20, "2026-03-01", None),
        ];
        assert!(assignment_on(&history, day("2026-02-15")).is_none());
    }
}
