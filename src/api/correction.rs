use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::attendance::{AttendanceResponse, rule_for};
use crate::auth::auth::{AuthUser, Role};
use crate::clock::Clock;
use crate::config::Config;
use crate::engine::period::parse_time_of_day;
use crate::engine::workflow::{self, ApprovalOverrides, SubmitCorrection, WorkflowError};
use crate::model::attendance::Attendance;
use crate::model::correction::{AttendanceCorrection, CorrectionStatus};

fn workflow_error_response(e: WorkflowError) -> actix_web::Result<HttpResponse> {
    match e {
        WorkflowError::DuplicatePendingCorrection
        | WorkflowError::EmptyCorrection
        | WorkflowError::InvalidTransition => Ok(HttpResponse::BadRequest().json(
            serde_json::json!({ "message": e.to_string() }),
        )),
        WorkflowError::AttendanceNotFound | WorkflowError::CorrectionNotFound => Ok(
            HttpResponse::NotFound().json(serde_json::json!({ "message": e.to_string() })),
        ),
        WorkflowError::Db(e) => {
            tracing::error!(error = %e, "correction workflow failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCorrection {
    #[schema(example = "2026-02-10T09:00:00", value_type = Option<String>, format = "date-time")]
    pub clock_in_at: Option<NaiveDateTime>,
    #[schema(example = "2026-02-11T06:00:00", value_type = Option<String>, format = "date-time")]
    pub clock_out_at: Option<NaiveDateTime>,
    #[schema(example = "forgot to clock out before leaving")]
    pub reason: String,
    pub note: Option<String>,
}

/// File a correction request against an attendance row.
#[utoipa::path(
    post,
    path = "/api/v1/corrections/attendance/{attendance_id}",
    request_body = CreateCorrection,
    params(
        ("attendance_id", description = "Attendance ID the correction targets")
    ),
    responses(
        (status = 200, description = "Correction submitted", body = Object, example = json!({
            "message": "Correction submitted",
            "status": "pending"
        })),
        (status = 400, description = "Duplicate pending correction or empty proposal"),
        (status = 403, description = "Not the owner of the attendance"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Correction"
)]
pub async fn submit_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<CreateCorrection>,
) -> actix_web::Result<impl Responder> {
    let attendance_id = path.into_inner();

    if payload.reason.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "reason is required"
        })));
    }

    let owner: Option<u64> = sqlx::query_scalar("SELECT user_id FROM attendances WHERE id = ?")
        .bind(attendance_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, attendance_id, "Failed to fetch attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(owner) = owner else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Attendance not found"
        })));
    };

    // Users dispute their own records; admins may file on anyone's behalf.
    if owner != auth.user_id && auth.role != Role::Admin {
        return Err(actix_web::error::ErrorForbidden(
            "Cannot correct another user's attendance",
        ));
    }

    let request = SubmitCorrection {
        clock_in_at: payload.clock_in_at,
        clock_out_at: payload.clock_out_at,
        reason: Some(payload.reason.clone()),
        note: payload.note.clone(),
    };

    match workflow::submit(pool.get_ref(), attendance_id, auth.user_id, request).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Correction submitted",
            "status": "pending"
        }))),
        Err(e) => workflow_error_response(e),
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PendingQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PendingCorrection {
    pub id: u64,
    pub requested_by: u64,
    #[schema(example = "pending")]
    pub status: String,
    pub reason: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    /// Whether the stored clock-out already falls on the day after the work
    /// date. Lets the review form preselect the next-day toggle.
    pub is_next_day: bool,
    pub attendance: AttendanceResponse,
}

#[derive(Serialize, ToSchema)]
pub struct PendingListResponse {
    pub data: Vec<PendingCorrection>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Reviewer queue: all pending corrections, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/corrections/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending corrections", body = PendingListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Correction"
)]
pub async fn pending_corrections(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<PendingQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = crate::api::page_offset(page, per_page);

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance_corrections WHERE status = ?")
            .bind(CorrectionStatus::Pending.as_str())
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to count pending corrections");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let corrections = sqlx::query_as::<_, AttendanceCorrection>(
        r#"
        SELECT * FROM attendance_corrections
        WHERE status = ?
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(CorrectionStatus::Pending.as_str())
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch pending corrections");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut data = Vec::with_capacity(corrections.len());
    for correction in corrections {
        let attendance =
            sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE id = ?")
                .bind(correction.attendance_id)
                .fetch_optional(pool.get_ref())
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, correction_id = correction.id, "Attendance fetch failed");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;

        // A correction can outlive its attendance only through manual data
        // surgery; skip such orphans rather than failing the whole queue.
        let Some(attendance) = attendance else {
            tracing::warn!(correction_id = correction.id, "correction without attendance");
            continue;
        };

        let rule = rule_for(
            pool.get_ref(),
            config.get_ref(),
            attendance.user_id,
            attendance.work_date,
        )
        .await?;

        let is_next_day = attendance
            .clock_out
            .is_some_and(|out| out.date() != attendance.work_date);

        data.push(PendingCorrection {
            id: correction.id,
            requested_by: correction.requested_by,
            status: correction.status,
            reason: correction.reason,
            clock_in_at: correction.clock_in_at,
            clock_out_at: correction.clock_out_at,
            note: correction.note,
            is_next_day,
            attendance: AttendanceResponse::build(attendance, &rule),
        });
    }

    Ok(HttpResponse::Ok().json(PendingListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveCorrection {
    /// Reviewer override, wall-clock "HH:MM"; the requester's proposal is
    /// used when omitted
    #[schema(example = "09:00")]
    pub clock_in: Option<String>,
    #[schema(example = "06:00")]
    pub clock_out: Option<String>,
    /// Authoritative when present; otherwise the crossing heuristic applies
    pub clock_out_is_next_day: Option<bool>,
    pub note: Option<String>,
}

/// Approve a pending correction and rewrite the attendance stamps.
#[utoipa::path(
    put,
    path = "/api/v1/corrections/{correction_id}/approve",
    request_body = ApproveCorrection,
    params(
        ("correction_id", description = "Correction ID")
    ),
    responses(
        (status = 200, description = "Correction approved", body = Object, example = json!({
            "message": "Correction approved"
        })),
        (status = 400, description = "Already reviewed or malformed time"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction not found")
    ),
    tag = "Correction"
)]
pub async fn approve_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
    payload: web::Json<ApproveCorrection>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let correction_id = path.into_inner();

    let clock_in = match payload.clock_in.as_deref().map(parse_time_of_day).transpose() {
        Ok(t) => t,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };
    let clock_out = match payload.clock_out.as_deref().map(parse_time_of_day).transpose() {
        Ok(t) => t,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };

    let overrides = ApprovalOverrides {
        clock_in,
        clock_out,
        clock_out_is_next_day: payload.clock_out_is_next_day,
        note: payload.note.clone(),
    };

    match workflow::approve(
        pool.get_ref(),
        &config.default_rule_name,
        correction_id,
        auth.user_id,
        overrides,
        clock.now(),
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Correction approved"
        }))),
        Err(e) => workflow_error_response(e),
    }
}

/// Reject a pending correction; the attendance row is left as it was.
#[utoipa::path(
    put,
    path = "/api/v1/corrections/{correction_id}/reject",
    params(
        ("correction_id", description = "Correction ID")
    ),
    responses(
        (status = 200, description = "Correction rejected", body = Object, example = json!({
            "message": "Correction rejected"
        })),
        (status = 400, description = "Already reviewed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Correction not found")
    ),
    tag = "Correction"
)]
pub async fn reject_correction(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let correction_id = path.into_inner();

    match workflow::reject(pool.get_ref(), correction_id, auth.user_id, clock.now()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Correction rejected"
        }))),
        Err(e) => workflow_error_response(e),
    }
}
