use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::clock::Clock;
use crate::config::Config;
use crate::engine::aggregate::month_bounds;
use crate::engine::period::parse_time_of_day;
use crate::engine::resolver::{self, ResolveError};
use crate::model::attendance::Attendance;
use crate::model::work_rule::WorkRule;

/// Minute figures derived for one attendance row under its effective rule.
/// `null` means "not computable", which is distinct from zero.
#[derive(Serialize, ToSchema)]
pub struct DerivedMinutes {
    #[schema(example = 480)]
    pub worked: Option<i64>,
    #[schema(example = 40)]
    pub overtime: Option<i64>,
    #[schema(example = 0)]
    pub night: Option<i64>,
    #[schema(example = 520)]
    pub total: Option<i64>,
}

impl DerivedMinutes {
    pub fn compute(attendance: &Attendance, rule: &WorkRule) -> Self {
        Self {
            worked: attendance.worked_minutes_for_rule(rule),
            overtime: attendance.overtime_minutes_for_rule(rule),
            night: attendance.night_minutes_for_rule(rule),
            total: attendance.total_minutes_for_rule(rule),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-02-10", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(example = "2026-02-10T09:00:00", value_type = Option<String>, format = "date-time")]
    pub clock_in: Option<NaiveDateTime>,
    #[schema(example = "2026-02-10T18:00:00", value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub is_late: bool,
    pub is_early_leave: bool,
    pub minutes: DerivedMinutes,
    #[schema(example = "regular")]
    pub work_rule: String,
}

impl AttendanceResponse {
    pub(crate) fn build(attendance: Attendance, rule: &WorkRule) -> Self {
        Self {
            id: attendance.id,
            user_id: attendance.user_id,
            work_date: attendance.work_date,
            clock_in: attendance.clock_in,
            clock_out: attendance.clock_out,
            minutes: DerivedMinutes::compute(&attendance, rule),
            note: attendance.note,
            is_late: attendance.is_late,
            is_early_leave: attendance.is_early_leave,
            work_rule: rule.name.clone(),
        }
    }
}

pub(crate) async fn rule_for(
    pool: &MySqlPool,
    config: &Config,
    user_id: u64,
    date: NaiveDate,
) -> Result<WorkRule, actix_web::Error> {
    resolver::resolve_rule(pool, &config.default_rule_name, user_id, date)
        .await
        .map_err(|e| match e {
            ResolveError::NoDefaultRule => {
                tracing::error!(user_id, %date, "no default work rule configured");
                actix_web::error::ErrorInternalServerError("No work rule configured")
            }
            ResolveError::Db(e) => {
                tracing::error!(error = %e, user_id, "work rule lookup failed");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            }
        })
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-in",
    responses(
        (status = 200, description = "Clocked in successfully", body = Object, example = json!({
            "message": "Clocked in"
        })),
        (status = 400, description = "Already clocked in today", body = Object, example = json!({
            "message": "Already clocked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let now = clock.now();
    let today = now.date();

    // Resolving up front surfaces a broken configuration before any write.
    rule_for(pool.get_ref(), config.get_ref(), auth.user_id, today).await?;

    let inserted = sqlx::query(
        "INSERT INTO attendances (user_id, work_date, clock_in) VALUES (?, ?, ?)",
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    match inserted {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Clocked in"
        }))),

        Err(e) => {
            // The unique (user_id, work_date) key caught a concurrent or
            // repeated clock-in; fill the stamp only if it is still empty.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    let updated = sqlx::query(
                        r#"
                        UPDATE attendances
                        SET clock_in = ?
                        WHERE user_id = ? AND work_date = ? AND clock_in IS NULL
                        "#,
                    )
                    .bind(now)
                    .bind(auth.user_id)
                    .bind(today)
                    .execute(pool.get_ref())
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, user_id = auth.user_id, "Clock-in failed");
                        actix_web::error::ErrorInternalServerError("Internal Server Error")
                    })?;

                    if updated.rows_affected() == 0 {
                        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                            "message": "Already clocked in today"
                        })));
                    }

                    return Ok(HttpResponse::Ok().json(serde_json::json!({
                        "message": "Clocked in"
                    })));
                }
            }

            tracing::error!(error = %e, user_id = auth.user_id, "Clock-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Clock-out endpoint. Targets the latest open row rather than today's, so a
/// shift that crossed midnight clocks out against yesterday's record.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out successfully", body = Object, example = json!({
            "message": "Clocked out"
        })),
        (status = 400, description = "No open attendance found", body = Object, example = json!({
            "message": "No open attendance to clock out"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let now = clock.now();

    let open = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendances
        WHERE user_id = ? AND clock_in IS NOT NULL AND clock_out IS NULL
        ORDER BY work_date DESC
        LIMIT 1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Clock-out lookup failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(mut attendance) = open else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No open attendance to clock out"
        })));
    };

    // Guarded update: a concurrent clock-out loses the race cleanly.
    let updated =
        sqlx::query("UPDATE attendances SET clock_out = ? WHERE id = ? AND clock_out IS NULL")
            .bind(now)
            .bind(attendance.id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = auth.user_id, "Clock-out failed");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No open attendance to clock out"
        })));
    }

    attendance.clock_out = Some(now);

    let rule = rule_for(
        pool.get_ref(),
        config.get_ref(),
        auth.user_id,
        attendance.work_date,
    )
    .await?;
    attendance.update_late_early_flags(&rule);

    sqlx::query("UPDATE attendances SET is_late = ?, is_early_leave = ? WHERE id = ?")
        .bind(attendance.is_late)
        .bind(attendance.is_early_leave)
        .bind(attendance.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, attendance_id = attendance.id, "Flag update failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Clocked out"
    })))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Month to list, "YYYY-MM"
    #[schema(example = "2026-02")]
    pub month: String,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub month: String,
    pub data: Vec<AttendanceResponse>,
}

/// A user's own attendance for one month, newest first, with derived minutes.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Monthly attendance history", body = HistoryResponse),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let Some((from, to)) = month_bounds(&query.month) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "month must look like YYYY-MM"
        })));
    };

    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendances
        WHERE user_id = ? AND work_date BETWEEN ? AND ?
        ORDER BY work_date DESC
        "#,
    )
    .bind(auth.user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "History fetch failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut data = Vec::with_capacity(rows.len());
    for attendance in rows {
        let rule = rule_for(
            pool.get_ref(),
            config.get_ref(),
            attendance.user_id,
            attendance.work_date,
        )
        .await?;
        data.push(AttendanceResponse::build(attendance, &rule));
    }

    Ok(HttpResponse::Ok().json(HistoryResponse {
        month: query.month.clone(),
        data,
    }))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DailyQuery {
    /// Day to list, "YYYY-MM-DD"
    #[schema(example = "2026-02-10", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct DailyListResponse {
    pub data: Vec<AttendanceResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Admin overview: every user's row for one date.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Attendance for the day", body = DailyListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Attendance"
)]
pub async fn daily_overview(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DailyQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = crate::api::page_offset(page, per_page);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendances WHERE work_date = ?")
        .bind(query.date)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count attendances");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let rows = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendances
        WHERE work_date = ?
        ORDER BY user_id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(query.date)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch daily attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut data = Vec::with_capacity(rows.len());
    for attendance in rows {
        let rule = rule_for(
            pool.get_ref(),
            config.get_ref(),
            attendance.user_id,
            attendance.work_date,
        )
        .await?;
        data.push(AttendanceResponse::build(attendance, &rule));
    }

    Ok(HttpResponse::Ok().json(DailyListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    /// Defaults to the row's work date when omitted
    #[schema(example = "2026-02-10", value_type = Option<String>, format = "date")]
    pub clock_in_date: Option<NaiveDate>,
    #[schema(example = "09:00")]
    pub clock_in: Option<String>,
    #[schema(example = "2026-02-11", value_type = Option<String>, format = "date")]
    pub clock_out_date: Option<NaiveDate>,
    #[schema(example = "06:00")]
    pub clock_out: Option<String>,
    #[schema(example = "terminal was down, stamped on paper")]
    pub note: Option<String>,
}

/// Admin backfill/edit of a row's stamps and note.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{attendance_id}",
    request_body = UpdateAttendance,
    params(
        ("attendance_id", description = "Attendance ID")
    ),
    responses(
        (status = 200, description = "Attendance updated"),
        (status = 400, description = "Malformed time"),
        (status = 404, description = "Attendance not found")
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<UpdateAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let attendance_id = path.into_inner();

    let row = sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE id = ?")
        .bind(attendance_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, attendance_id, "Failed to fetch attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(mut attendance) = row else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Attendance not found"
        })));
    };

    let clock_in_time = match body.clock_in.as_deref().map(parse_time_of_day).transpose() {
        Ok(t) => t,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };
    let clock_out_time = match body.clock_out.as_deref().map(parse_time_of_day).transpose() {
        Ok(t) => t,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };

    let clock_in =
        clock_in_time.map(|t| body.clock_in_date.unwrap_or(attendance.work_date).and_time(t));
    let mut clock_out =
        clock_out_time.map(|t| body.clock_out_date.unwrap_or(attendance.work_date).and_time(t));

    // No explicit clock-out date: the usual crossing heuristic rescues a
    // form that stamped 22:00 -> 06:00 without marking the next day.
    if body.clock_out_date.is_none() {
        if let (Some(cin), Some(cout)) = (clock_in, clock_out.as_mut()) {
            if *cout <= cin {
                *cout += chrono::Duration::days(1);
            }
        }
    }

    attendance.clock_in = clock_in;
    attendance.clock_out = clock_out;
    attendance.note = body.note.clone();

    let rule = rule_for(
        pool.get_ref(),
        config.get_ref(),
        attendance.user_id,
        attendance.work_date,
    )
    .await?;
    attendance.update_late_early_flags(&rule);

    sqlx::query(
        r#"
        UPDATE attendances
        SET clock_in = ?, clock_out = ?, note = ?, is_late = ?, is_early_leave = ?
        WHERE id = ?
        "#,
    )
    .bind(attendance.clock_in)
    .bind(attendance.clock_out)
    .bind(&attendance.note)
    .bind(attendance.is_late)
    .bind(attendance.is_early_leave)
    .bind(attendance.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, attendance_id, "Failed to update attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance updated"
    })))
}
