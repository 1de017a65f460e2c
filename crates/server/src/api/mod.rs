//! JSON REST surface.
//!
//! - `GET|POST /api/employees`, `GET|PUT|DELETE /api/employees/{id}`,
//!   `POST /api/employees/{id}/restore`
//! - `GET|POST /api/attendance`
//! - `GET|POST /api/leaves`, `GET|PUT|DELETE /api/leaves/{id}`
//! - `GET|POST /api/payrolls`, `GET|PUT|DELETE /api/payrolls/{id}`,
//!   `GET /api/payrolls/{id}/audit-logs`, `POST /api/payrolls/preview`
//! - `GET|POST /api/scm-requests`, `GET|PUT|DELETE /api/scm-requests/{id}`
//! - `GET|POST /api/branch-distribution-requests`,
//!   `GET|PUT|DELETE /api/branch-distribution-requests/{id}`
//! - `POST /api/{resource}/{id}/{action}` for any workflow action
//! - `GET /api/audit-logs`

mod hr;
mod payroll;
mod supply;
mod workflow;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use erpflow_core::config::AppConfig;
use erpflow_core::errors::{ApplicationError, InterfaceError};
use erpflow_core::payroll::DeductionSchedule;
use erpflow_core::workflow::states::EntityKind;
use erpflow_db::{DbPool, WorkflowService};

#[derive(Clone)]
pub struct ApiState {
    pub(crate) db_pool: DbPool,
    pub(crate) workflow: Arc<WorkflowService>,
    pub(crate) schedule: Arc<DeductionSchedule>,
}

impl ApiState {
    pub fn new(db_pool: DbPool, config: &AppConfig) -> Self {
        Self {
            workflow: Arc::new(WorkflowService::new(db_pool.clone(), config.audit.clone())),
            db_pool,
            schedule: Arc::new(DeductionSchedule::standard()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub kind: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Filters accepted by the list endpoints of the workflow entities.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub employee_id: Option<String>,
}

impl From<ListQuery> for erpflow_db::repositories::RecordFilter {
    fn from(value: ListQuery) -> Self {
        Self {
            status: value.status.filter(|status| !status.trim().is_empty()),
            employee_id: value.employee_id.filter(|id| !id.trim().is_empty()),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    let mut api = Router::new()
        .route("/api/employees", get(hr::list_employees).post(hr::create_employee))
        .route(
            "/api/employees/{id}",
            get(hr::get_employee).put(hr::update_employee).delete(hr::delete_employee),
        )
        .route("/api/employees/{id}/restore", post(hr::restore_employee))
        .route("/api/attendance", get(hr::list_attendance).post(hr::record_attendance))
        .route("/api/leaves", get(hr::list_leaves).post(hr::create_leave))
        .route(
            "/api/leaves/{id}",
            get(hr::get_leave).put(hr::update_leave).delete(hr::delete_leave),
        )
        .route("/api/payrolls", get(payroll::list_payrolls).post(payroll::create_payroll))
        .route("/api/payrolls/preview", post(payroll::preview_payroll))
        .route(
            "/api/payrolls/{id}",
            get(payroll::get_payroll)
                .put(payroll::update_payroll)
                .delete(payroll::delete_payroll),
        )
        .route("/api/payrolls/{id}/audit-logs", get(payroll::payroll_audit_logs))
        .route("/api/scm-requests", get(supply::list_scm_requests).post(supply::create_scm_request))
        .route(
            "/api/scm-requests/{id}",
            get(supply::get_scm_request)
                .put(supply::update_scm_request)
                .delete(supply::delete_scm_request),
        )
        .route(
            "/api/branch-distribution-requests",
            get(supply::list_distributions).post(supply::create_distribution),
        )
        .route(
            "/api/branch-distribution-requests/{id}",
            get(supply::get_distribution)
                .put(supply::update_distribution)
                .delete(supply::delete_distribution),
        )
        .route("/api/audit-logs", get(workflow::list_audit_logs))
        .route("/api/{resource}/{id}/{action}", post(workflow::apply_action));

    // Known resources get their own action route so it sits beside the
    // static `/api/{resource}/{id}/...` routes without relying on backtracking.
    for kind in EntityKind::ALL {
        api = api.route(
            &format!("/api/{}/{{id}}/{{action}}", kind.resource()),
            post(
                move |state: State<ApiState>,
                      Path((id, action)): Path<(String, String)>,
                      body: Json<workflow::ActionBody>| {
                    workflow::apply_for_kind(kind, state, id, action, body)
                },
            ),
        );
    }

    api.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Maps an application failure to its HTTP status and error body. Every
/// failure gets a fresh correlation id that appears in the log line.
pub(crate) fn failure(error: ApplicationError) -> ApiError {
    let interface = error.into_interface(Uuid::new_v4().to_string());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::UnprocessableTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id = interface.correlation_id(),
            kind = interface.class(),
            error = interface.message(),
            "request failed"
        );
    } else {
        warn!(
            event_name = "api.request.refused",
            correlation_id = interface.correlation_id(),
            kind = interface.class(),
            error = interface.message(),
            "request refused"
        );
    }

    (
        status,
        Json(ErrorBody {
            error: interface.user_message().to_string(),
            detail: interface.message().to_string(),
            kind: interface.class().to_string(),
        }),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    failure(ApplicationError::validation(message))
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
