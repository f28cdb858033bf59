//! Correction request state machine: pending -> approved | rejected.
//!
//! Submission and review are read-modify-write operations on shared rows, so
//! each runs in a single transaction with the touched rows locked. A losing
//! concurrent reviewer observes the terminal state and gets
//! `InvalidTransition` instead of double-applying.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySqlPool;
use thiserror::Error;
use tracing::warn;

use crate::engine::resolver::{self, ResolveError};
use crate::model::attendance::Attendance;
use crate::model::correction::{AttendanceCorrection, CorrectionStatus};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("a pending correction already exists for this attendance")]
    DuplicatePendingCorrection,

    #[error("the correction proposes no change")]
    EmptyCorrection,

    #[error("the correction has already been reviewed")]
    InvalidTransition,

    #[error("attendance record not found")]
    AttendanceNotFound,

    #[error("correction not found")]
    CorrectionNotFound,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct SubmitCorrection {
    pub clock_in_at: Option<NaiveDateTime>,
    pub clock_out_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

impl SubmitCorrection {
    /// At least one of the proposed stamps or the note must carry a value.
    fn proposes_a_change(&self) -> bool {
        self.clock_in_at.is_some()
            || self.clock_out_at.is_some()
            || self.note.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Reviewer-side inputs to an approval. Overrides win over the requester's
/// proposed values; times are wall-clock, re-anchored at the work date.
#[derive(Debug, Clone, Default)]
pub struct ApprovalOverrides {
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub clock_out_is_next_day: Option<bool>,
    pub note: Option<String>,
}

/// A correction may only be reviewed while its stored status reads
/// `pending`; the terminal states (and any unknown string) refuse.
fn ensure_reviewable(status: &str) -> Result<(), WorkflowError> {
    if CorrectionStatus::from_str(status) == Ok(CorrectionStatus::Pending) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition)
    }
}

/// At most one pending correction may exist per attendance row.
fn ensure_no_pending(pending_count: i64) -> Result<(), WorkflowError> {
    if pending_count > 0 {
        Err(WorkflowError::DuplicatePendingCorrection)
    } else {
        Ok(())
    }
}

/// Anchor the final wall-clock times at the work date. The explicit
/// next-day flag is authoritative when supplied; without it the clock-out
/// crosses midnight exactly when it is not after the clock-in.
pub fn finalize_stamps(
    work_date: NaiveDate,
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
    clock_out_is_next_day: Option<bool>,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let clock_in_at = clock_in.map(|t| work_date.and_time(t));
    let mut clock_out_at = clock_out.map(|t| work_date.and_time(t));

    if let Some(out) = clock_out_at.as_mut() {
        let crosses = match clock_out_is_next_day {
            Some(flag) => flag,
            None => clock_in_at.is_some_and(|cin| *out <= cin),
        };
        if crosses {
            *out += Duration::days(1);
        }
    }

    (clock_in_at, clock_out_at)
}

/// File a pending correction against an attendance row. Refused while an
/// earlier correction on the same row is still pending.
pub async fn submit(
    pool: &MySqlPool,
    attendance_id: u64,
    requested_by: u64,
    request: SubmitCorrection,
) -> Result<u64, WorkflowError> {
    if !request.proposes_a_change() {
        return Err(WorkflowError::EmptyCorrection);
    }

    let mut tx = pool.begin().await?;

    // Locking the attendance row serializes concurrent submissions, so the
    // pending-count check below cannot race.
    let attendance: Option<u64> =
        sqlx::query_scalar("SELECT id FROM attendances WHERE id = ? FOR UPDATE")
            .bind(attendance_id)
            .fetch_optional(&mut *tx)
            .await?;
    if attendance.is_none() {
        return Err(WorkflowError::AttendanceNotFound);
    }

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_corrections WHERE attendance_id = ? AND status = ?",
    )
    .bind(attendance_id)
    .bind(CorrectionStatus::Pending.as_str())
    .fetch_one(&mut *tx)
    .await?;
    ensure_no_pending(pending)?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_corrections
            (attendance_id, requested_by, clock_in_at, clock_out_at, note, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(attendance_id)
    .bind(requested_by)
    .bind(request.clock_in_at)
    .bind(request.clock_out_at)
    .bind(request.note)
    .bind(request.reason)
    .bind(CorrectionStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.last_insert_id())
}

/// Approve a pending correction: write the finalized stamps onto the
/// attendance row, keep them on the correction for audit, and recompute the
/// late/early flags under the rule effective on the work date.
pub async fn approve(
    pool: &MySqlPool,
    default_rule_name: &str,
    correction_id: u64,
    reviewer_id: u64,
    overrides: ApprovalOverrides,
    now: NaiveDateTime,
) -> Result<(), WorkflowError> {
    let mut tx = pool.begin().await?;

    let correction = sqlx::query_as::<_, AttendanceCorrection>(
        "SELECT * FROM attendance_corrections WHERE id = ? FOR UPDATE",
    )
    .bind(correction_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(WorkflowError::CorrectionNotFound)?;

    ensure_reviewable(&correction.status)?;

    let mut attendance =
        sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE id = ? FOR UPDATE")
            .bind(correction.attendance_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(WorkflowError::AttendanceNotFound)?;

    // Reviewer edits win; otherwise fall back to the requester's proposal.
    let clock_in = overrides
        .clock_in
        .or_else(|| correction.clock_in_at.map(|at| at.time()));
    let clock_out = overrides
        .clock_out
        .or_else(|| correction.clock_out_at.map(|at| at.time()));

    let (clock_in_at, clock_out_at) = finalize_stamps(
        attendance.work_date,
        clock_in,
        clock_out,
        overrides.clock_out_is_next_day,
    );

    attendance.clock_in = clock_in_at;
    attendance.clock_out = clock_out_at;

    match resolver::resolve_rule(pool, default_rule_name, attendance.user_id, attendance.work_date)
        .await
    {
        Ok(rule) => attendance.update_late_early_flags(&rule),
        Err(ResolveError::NoDefaultRule) => {
            // The approval itself still stands; the flags stay as they were.
            warn!(
                attendance_id = attendance.id,
                "no work rule resolvable, late/early flags not recomputed"
            );
        }
        Err(ResolveError::Db(e)) => return Err(WorkflowError::Db(e)),
    }

    sqlx::query(
        r#"
        UPDATE attendances
        SET clock_in = ?, clock_out = ?, is_late = ?, is_early_leave = ?
        WHERE id = ?
        "#,
    )
    .bind(attendance.clock_in)
    .bind(attendance.clock_out)
    .bind(attendance.is_late)
    .bind(attendance.is_early_leave)
    .bind(attendance.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE attendance_corrections
        SET status = ?, reviewed_by = ?, reviewed_at = ?,
            clock_in_at = ?, clock_out_at = ?,
            note = COALESCE(?, note)
        WHERE id = ?
        "#,
    )
    .bind(CorrectionStatus::Approved.as_str())
    .bind(reviewer_id)
    .bind(now)
    .bind(clock_in_at)
    .bind(clock_out_at)
    .bind(overrides.note)
    .bind(correction_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Reject a pending correction. The attendance row is untouched.
pub async fn reject(
    pool: &MySqlPool,
    correction_id: u64,
    reviewer_id: u64,
    now: NaiveDateTime,
) -> Result<(), WorkflowError> {
    let mut tx = pool.begin().await?;

    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM attendance_corrections WHERE id = ? FOR UPDATE")
            .bind(correction_id)
            .fetch_optional(&mut *tx)
            .await?;

    let status = status.ok_or(WorkflowError::CorrectionNotFound)?;
    ensure_reviewable(&status)?;

    sqlx::query(
        "UPDATE attendance_corrections SET status = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
    )
    .bind(CorrectionStatus::Rejected.as_str())
    .bind(reviewer_id)
    .bind(now)
    .bind(correction_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    #[test]
    fn empty_submission_is_detected() {
        let empty = SubmitCorrection {
            clock_in_at: None,
            clock_out_at: None,
            reason: Some("forgot to clock out".into()),
            note: Some("   ".into()),
        };
        assert!(!empty.proposes_a_change());

        let with_stamp = SubmitCorrection {
            clock_in_at: Some(date().and_time(t(9, 0))),
            ..empty.clone()
        };
        assert!(with_stamp.proposes_a_change());

        let with_note = SubmitCorrection {
            note: Some("clocked in from the warehouse".into()),
            ..empty
        };
        assert!(with_note.proposes_a_change());
    }

    #[test]
    fn only_pending_corrections_are_reviewable() {
        assert!(ensure_reviewable("pending").is_ok());

        for terminal in ["approved", "rejected", "reviewed", ""] {
            assert!(matches!(
                ensure_reviewable(terminal),
                Err(WorkflowError::InvalidTransition)
            ));
        }
    }

    #[test]
    fn a_second_submission_is_refused_while_one_is_pending() {
        assert!(ensure_no_pending(0).is_ok());
        assert!(matches!(
            ensure_no_pending(1),
            Err(WorkflowError::DuplicatePendingCorrection)
        ));
    }

    #[test]
    fn stamps_are_anchored_at_the_work_date() {
        let (cin, cout) = finalize_stamps(date(), Some(t(9, 0)), Some(t(18, 0)), None);
        assert_eq!(cin, Some(date().and_time(t(9, 0))));
        assert_eq!(cout, Some(date().and_time(t(18, 0))));
    }

    #[test]
    fn heuristic_advances_a_clock_out_not_after_the_clock_in() {
        let (_, cout) = finalize_stamps(date(), Some(t(22, 0)), Some(t(6, 0)), None);
        assert_eq!(cout, Some(date().succ_opt().unwrap().and_time(t(6, 0))));

        // Without a clock-in there is nothing to compare against.
        let (_, cout) = finalize_stamps(date(), None, Some(t(6, 0)), None);
        assert_eq!(cout, Some(date().and_time(t(6, 0))));
    }

    #[test]
    fn explicit_flag_beats_the_heuristic() {
        // Forced onto the next day even though the heuristic would not fire.
        let (_, cout) = finalize_stamps(date(), Some(t(9, 0)), Some(t(18, 0)), Some(true));
        assert_eq!(cout, Some(date().succ_opt().unwrap().and_time(t(18, 0))));

        // Explicit false pins the clock-out to the work date.
        let (_, cout) = finalize_stamps(date(), Some(t(22, 0)), Some(t(6, 0)), Some(false));
        assert_eq!(cout, Some(date().and_time(t(6, 0))));
    }
}
