use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::engine::period::parse_time_of_day;
use crate::model::schedule_assignment::ScheduleAssignment;
use crate::model::work_rule::WorkRule;

#[derive(Serialize, ToSchema)]
pub struct WorkRuleListResponse {
    pub data: Vec<WorkRule>,
}

/// List all schedule templates.
#[utoipa::path(
    get,
    path = "/api/v1/work-rules",
    responses(
        (status = 200, description = "All work rules", body = WorkRuleListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "WorkRule"
)]
pub async fn list_rules(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let data = sqlx::query_as::<_, WorkRule>("SELECT * FROM work_rules ORDER BY id")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch work rules");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(WorkRuleListResponse { data }))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateWorkRule {
    /// "HH:MM" or null to clear
    #[schema(example = "09:00")]
    pub work_start: Option<String>,
    #[schema(example = "18:00")]
    pub work_end: Option<String>,
    #[schema(example = "12:00")]
    pub break_start: Option<String>,
    #[schema(example = "13:00")]
    pub break_end: Option<String>,
    /// Kept unchanged when omitted
    #[schema(example = 10)]
    pub rounding_unit_minutes: Option<i32>,
}

fn parse_optional_time(
    value: Option<&str>,
) -> Result<Option<NaiveTime>, HttpResponse> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(parse_time_of_day)
        .transpose()
        .map_err(|e| {
            HttpResponse::BadRequest().json(serde_json::json!({ "message": e.to_string() }))
        })
}

/// Edit a schedule template's times, break and rounding unit.
#[utoipa::path(
    put,
    path = "/api/v1/work-rules/{rule_id}",
    request_body = UpdateWorkRule,
    params(
        ("rule_id", description = "Work rule ID")
    ),
    responses(
        (status = 200, description = "Work rule updated"),
        (status = 400, description = "Invalid times, half-open break or bad rounding unit"),
        (status = 404, description = "Work rule not found")
    ),
    tag = "WorkRule"
)]
pub async fn update_rule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateWorkRule>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let rule_id = path.into_inner();

    let work_start = match parse_optional_time(body.work_start.as_deref()) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };
    let work_end = match parse_optional_time(body.work_end.as_deref()) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };
    let break_start = match parse_optional_time(body.break_start.as_deref()) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };
    let break_end = match parse_optional_time(body.break_end.as_deref()) {
        Ok(t) => t,
        Err(resp) => return Ok(resp),
    };

    if break_start.is_some() != break_end.is_some() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "break_start and break_end must be set together"
        })));
    }

    if let Some(unit) = body.rounding_unit_minutes {
        if unit <= 0 {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "rounding_unit_minutes must be positive"
            })));
        }
    }

    let result = sqlx::query(
        r#"
        UPDATE work_rules
        SET work_start = ?, work_end = ?, break_start = ?, break_end = ?,
            rounding_unit_minutes = COALESCE(?, rounding_unit_minutes)
        WHERE id = ?
        "#,
    )
    .bind(work_start)
    .bind(work_end)
    .bind(break_start)
    .bind(break_end)
    .bind(body.rounding_unit_minutes)
    .bind(rule_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, rule_id, "Failed to update work rule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Work rule not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Work rule updated"
    })))
}

#[derive(Serialize, ToSchema)]
pub struct AssignmentListResponse {
    pub data: Vec<ScheduleAssignment>,
}

/// A user's work-rule history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/work-rules/assignments/{user_id}",
    params(
        ("user_id", description = "User ID")
    ),
    responses(
        (status = 200, description = "Assignment history", body = AssignmentListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "WorkRule"
)]
pub async fn assignment_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let data = sqlx::query_as::<_, ScheduleAssignment>(
        "SELECT * FROM schedule_assignments WHERE user_id = ? ORDER BY start_date DESC",
    )
    .bind(user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to fetch assignments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(AssignmentListResponse { data }))
}

#[derive(Deserialize, ToSchema)]
pub struct AssignWorkRule {
    #[schema(example = 2)]
    pub work_rule_id: u64,
    #[schema(example = "2026-03-01", value_type = String, format = "date")]
    pub start_date: NaiveDate,
}

/// Assign a rule to a user from a start date onward. The previous open-ended
/// entry is closed at the day before, keeping the history a partition.
#[utoipa::path(
    put,
    path = "/api/v1/work-rules/assignments/{user_id}",
    request_body = AssignWorkRule,
    params(
        ("user_id", description = "User ID")
    ),
    responses(
        (status = 200, description = "Rule assigned"),
        (status = 400, description = "Later history already exists or unknown rule"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "WorkRule"
)]
pub async fn assign_rule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<AssignWorkRule>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    let start = body.start_date;

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let rule_exists: Option<u64> = sqlx::query_scalar("SELECT id FROM work_rules WHERE id = ?")
        .bind(body.work_rule_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch work rule");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if rule_exists.is_none() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Unknown work rule"
        })));
    }

    // Rewriting history is refused: a start date at or before an existing
    // later entry would overlap it.
    let conflict: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM schedule_assignments WHERE user_id = ? AND start_date >= ? FOR UPDATE",
    )
    .bind(user_id)
    .bind(start)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Assignment conflict check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if conflict > 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "An assignment already starts on or after that date"
        })));
    }

    let previous = sqlx::query_as::<_, ScheduleAssignment>(
        r#"
        SELECT * FROM schedule_assignments
        WHERE user_id = ? AND start_date <= ?
        ORDER BY start_date DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(start)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Previous assignment lookup failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if let Some(prev) = previous {
        let still_open = prev.end_date.is_none_or(|end| end >= start);
        if still_open {
            sqlx::query("UPDATE schedule_assignments SET end_date = ? WHERE id = ?")
                .bind(start - Duration::days(1))
                .bind(prev.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, user_id, "Failed to close previous assignment");
                    actix_web::error::ErrorInternalServerError("Internal Server Error")
                })?;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO schedule_assignments (user_id, work_rule_id, start_date, end_date)
        VALUES (?, ?, ?, NULL)
        "#,
    )
    .bind(user_id)
    .bind(body.work_rule_id)
    .bind(start)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to insert assignment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit assignment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Work rule assigned"
    })))
}
