use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Review states of a correction request. `Pending` is the only state a
/// reviewer may transition out of; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CorrectionStatus {
    Pending,
    Approved,
    Rejected,
}

impl CorrectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionStatus::Pending => "pending",
            CorrectionStatus::Approved => "approved",
            CorrectionStatus::Rejected => "rejected",
        }
    }
}

/// A proposed revision of an attendance row's stamps. Proposed values are
/// full timestamps; approval re-anchors them at the attendance work date and
/// stores the finalized values back here for audit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceCorrection {
    pub id: u64,
    pub attendance_id: u64,
    pub requested_by: u64,
    pub clock_in_at: Option<NaiveDateTime>,
    pub clock_out_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub reason: Option<String>,
    pub status: String,
    pub reviewed_by: Option<u64>,
    pub reviewed_at: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_the_db_string() {
        for status in [
            CorrectionStatus::Pending,
            CorrectionStatus::Approved,
            CorrectionStatus::Rejected,
        ] {
            assert_eq!(CorrectionStatus::from_str(status.as_str()), Ok(status));
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!(CorrectionStatus::from_str("reviewed").is_err());
    }
}
