use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::attendance::rule_for;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::aggregate::{self, MonthlySummary, month_bounds};
use crate::engine::calculator::OvertimePolicy;
use crate::model::attendance::Attendance;
use crate::model::work_rule::WorkRule;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReportQuery {
    /// Month to report, "YYYY-MM"
    #[schema(example = "2026-02")]
    pub month: String,
    /// Restrict to one user
    #[schema(example = 7)]
    pub user_id: Option<u64>,
    /// Defaults to counting minutes past the scheduled end
    pub overtime_policy: Option<OvertimePolicy>,
}

#[derive(Serialize, ToSchema)]
pub struct ReportResponse {
    pub month: String,
    pub data: Vec<MonthlySummary>,
}

/// Per-user monthly totals: worked, overtime and night minutes plus
/// late and early-leave day counts.
#[utoipa::path(
    get,
    path = "/api/v1/reports/monthly",
    params(ReportQuery),
    responses(
        (status = 200, description = "Monthly summaries", body = ReportResponse),
        (status = 400, description = "Malformed month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Report"
)]
pub async fn monthly_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let Some((from, to)) = month_bounds(&query.month) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "month must look like YYYY-MM"
        })));
    };

    let policy = query.overtime_policy.unwrap_or_default();

    let rows = match query.user_id {
        Some(user_id) => sqlx::query_as::<_, Attendance>(
            r#"
            SELECT * FROM attendances
            WHERE user_id = ? AND work_date BETWEEN ? AND ?
            ORDER BY user_id, work_date
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool.get_ref())
        .await,
        None => sqlx::query_as::<_, Attendance>(
            r#"
            SELECT * FROM attendances
            WHERE work_date BETWEEN ? AND ?
            ORDER BY user_id, work_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool.get_ref())
        .await,
    }
    .map_err(|e| {
        tracing::error!(error = %e, month = %query.month, "Report fetch failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Rows arrive sorted by user, so summaries fall out of one linear pass.
    let mut data = Vec::new();
    let mut current: Option<(u64, Vec<(Attendance, WorkRule)>)> = None;

    for attendance in rows {
        let rule = rule_for(
            pool.get_ref(),
            config.get_ref(),
            attendance.user_id,
            attendance.work_date,
        )
        .await?;

        match current.as_mut() {
            Some((user_id, group)) if *user_id == attendance.user_id => {
                group.push((attendance, rule));
            }
            _ => {
                if let Some((user_id, group)) = current.take() {
                    data.push(aggregate::summarize(user_id, &group, policy));
                }
                current = Some((attendance.user_id, vec![(attendance, rule)]));
            }
        }
    }
    if let Some((user_id, group)) = current.take() {
        data.push(aggregate::summarize(user_id, &group, policy));
    }

    Ok(HttpResponse::Ok().json(ReportResponse {
        month: query.month.clone(),
        data,
    }))
}
