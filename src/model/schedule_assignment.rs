use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry of a user's work-rule history. Ranges never overlap per user;
/// an open-ended entry (`end_date` null) is closed when the next one starts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ScheduleAssignment {
    pub id: u64,
    pub user_id: u64,
    pub work_rule_id: u64,
    #[schema(example = "2026-02-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-28", value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

impl ScheduleAssignment {
    /// Both bounds are inclusive; a null end means "still in effect".
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if self.start_date > date {
            return false;
        }

        match self.end_date {
            Some(end) => end >= date,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(start: &str, end: Option<&str>) -> ScheduleAssignment {
        ScheduleAssignment {
            id: 1,
            user_id: 1,
            work_rule_id: 1,
            start_date: start.parse().unwrap(),
            end_date: end.map(|e| e.parse().unwrap()),
        }
    }

    #[test]
    fn closed_range_is_inclusive_on_both_ends() {
        let a = assignment("2026-02-01", Some("2026-02-28"));
        assert!(!a.is_active_on("2026-01-31".parse().unwrap()));
        assert!(a.is_active_on("2026-02-01".parse().unwrap()));
        assert!(a.is_active_on("2026-02-28".parse().unwrap()));
        assert!(!a.is_active_on("2026-03-01".parse().unwrap()));
    }

    #[test]
    fn open_range_covers_everything_from_start() {
        let a = assignment("2026-02-01", None);
        assert!(!a.is_active_on("2026-01-15".parse().unwrap()));
        assert!(a.is_active_on("2027-12-31".parse().unwrap()));
    }
}
