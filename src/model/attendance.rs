use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One user-day clock record. `(user_id, work_date)` is unique in storage;
/// the stamps are full timestamps so a shift may run past midnight.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,
    pub work_date: NaiveDate,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub is_late: bool,
    pub is_early_leave: bool,
}
