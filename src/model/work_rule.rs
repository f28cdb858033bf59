use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named schedule template. Times are wall-clock values; a window whose end
/// is not after its start crosses midnight (see `engine::period`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkRule {
    pub id: u64,

    #[schema(example = "regular")]
    pub name: String,

    #[schema(example = "09:00:00", value_type = Option<String>, format = "time")]
    pub work_start: Option<NaiveTime>,

    #[schema(example = "18:00:00", value_type = Option<String>, format = "time")]
    pub work_end: Option<NaiveTime>,

    #[schema(example = "12:00:00", value_type = Option<String>, format = "time")]
    pub break_start: Option<NaiveTime>,

    #[schema(example = "13:00:00", value_type = Option<String>, format = "time")]
    pub break_end: Option<NaiveTime>,

    #[schema(example = 10)]
    pub rounding_unit_minutes: i32,
}

impl WorkRule {
    /// Scheduled shift boundaries, present only when both ends are set.
    pub fn work_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((self.work_start?, self.work_end?))
    }

    /// Break boundaries. The schema keeps the pair both-set or both-null.
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((self.break_start?, self.break_end?))
    }
}
