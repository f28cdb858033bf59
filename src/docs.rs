use crate::api::attendance::{
    AttendanceResponse, DailyListResponse, DailyQuery, DerivedMinutes, HistoryQuery,
    HistoryResponse, UpdateAttendance,
};
use crate::api::correction::{
    ApproveCorrection, CreateCorrection, PendingCorrection, PendingListResponse, PendingQuery,
};
use crate::api::report::{ReportQuery, ReportResponse};
use crate::api::work_rule::{
    AssignWorkRule, AssignmentListResponse, UpdateWorkRule, WorkRuleListResponse,
};
use crate::engine::aggregate::MonthlySummary;
use crate::engine::calculator::OvertimePolicy;
use crate::model::schedule_assignment::ScheduleAssignment;
use crate::model::work_rule::WorkRule;
use utoipa::OpenApi;
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## Employee Timeclock Service

This API powers an employee **attendance tracking** service: clock punches, work-rule based minute calculation, correction review and monthly reporting.

### 🔹 Key Features
- **Attendance**
  - Clock in / clock out, monthly history, admin daily overview and backfill
- **Corrections**
  - Dispute a day's stamps; reviewers approve or reject from a pending queue
- **Work Rules**
  - Named schedule templates with breaks and rounding; per-user assignment history
- **Reports**
  - Per-user monthly totals of worked, overtime and night minutes

### 🔐 Security
Endpoints consume the identity headers (`X-User-Id`, `X-User-Role`) set by the
authenticating gateway. Admin-only operations require the `admin` role.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::history,
        crate::api::attendance::daily_overview,
        crate::api::attendance::update_attendance,

        crate::api::correction::submit_correction,
        crate::api::correction::pending_corrections,
        crate::api::correction::approve_correction,
        crate::api::correction::reject_correction,

        crate::api::work_rule::list_rules,
        crate::api::work_rule::update_rule,
        crate::api::work_rule::assignment_history,
        crate::api::work_rule::assign_rule,

        crate::api::report::monthly_report
    ),
    components(
        schemas(
            DerivedMinutes,
            AttendanceResponse,
            HistoryQuery,
            HistoryResponse,
            DailyQuery,
            DailyListResponse,
            UpdateAttendance,
            CreateCorrection,
            PendingQuery,
            PendingCorrection,
            PendingListResponse,
            ApproveCorrection,
            WorkRule,
            WorkRuleListResponse,
            UpdateWorkRule,
            ScheduleAssignment,
            AssignmentListResponse,
            AssignWorkRule,
            OvertimePolicy,
            MonthlySummary,
            ReportQuery,
            ReportResponse
        )
    ),
    tags(
        (name = "Attendance", description = "Clock punches and attendance records"),
        (name = "Correction", description = "Attendance correction workflow"),
        (name = "WorkRule", description = "Schedule templates and assignments"),
        (name = "Report", description = "Monthly aggregation"),
    )
)]
pub struct ApiDoc;
