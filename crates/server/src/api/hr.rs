use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use tracing::info;

use erpflow_core::domain::attendance::{AttendanceId, AttendanceRecord, AttendanceStatus};
use erpflow_core::domain::employee::{Employee, EmployeeDraft, EmployeeId};
use erpflow_core::domain::leave::{LeaveDraft, LeaveId, LeaveRequest};
use erpflow_core::errors::ApplicationError;
use erpflow_core::workflow::states::EntityKind;
use erpflow_db::repositories::{
    AttendanceRepository, EmployeeRepository, LeaveRepository, SqlAttendanceRepository,
    SqlEmployeeRepository, SqlLeaveRepository,
};

use super::{failure, new_id, ApiError, ApiResult, ApiState, ListQuery};

pub(super) async fn active_employee(
    state: &ApiState,
    id: &EmployeeId,
) -> Result<Employee, ApiError> {
    SqlEmployeeRepository::new(state.db_pool.clone())
        .find_by_id(id)
        .await
        .map_err(|error| failure(error.into()))?
        .filter(|employee| employee.lifecycle.is_active())
        .ok_or_else(|| failure(ApplicationError::not_found("employee", &id.0)))
}

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

pub async fn list_employees(State(state): State<ApiState>) -> ApiResult<Vec<Employee>> {
    SqlEmployeeRepository::new(state.db_pool.clone())
        .list_active()
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn create_employee(
    State(state): State<ApiState>,
    Json(draft): Json<EmployeeDraft>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let employee = Employee::create(EmployeeId(new_id()), draft, Utc::now())
        .map_err(|error| failure(error.into()))?;
    SqlEmployeeRepository::new(state.db_pool.clone())
        .insert(&employee)
        .await
        .map_err(|error| failure(error.into()))?;

    info!(
        event_name = "hr.employee.created",
        employee_id = %employee.id.0,
        employee_no = %employee.employee_no,
        "employee created"
    );
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn get_employee(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Employee> {
    active_employee(&state, &EmployeeId(id)).await.map(Json)
}

pub async fn update_employee(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(draft): Json<EmployeeDraft>,
) -> ApiResult<Employee> {
    let mut employee = active_employee(&state, &EmployeeId(id)).await?;
    employee.revise(draft, Utc::now()).map_err(|error| failure(error.into()))?;
    SqlEmployeeRepository::new(state.db_pool.clone())
        .update(&employee)
        .await
        .map_err(|error| failure(error.into()))?;
    Ok(Json(employee))
}

pub async fn delete_employee(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    SqlEmployeeRepository::new(state.db_pool.clone())
        .soft_delete(&EmployeeId(id.clone()), Utc::now())
        .await
        .map_err(|error| failure(error.into()))?;
    info!(event_name = "hr.employee.deleted", employee_id = %id, "employee soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_employee(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Employee> {
    let id = EmployeeId(id);
    SqlEmployeeRepository::new(state.db_pool.clone())
        .restore(&id, Utc::now())
        .await
        .map_err(|error| failure(error.into()))?;
    info!(event_name = "hr.employee.restored", employee_id = %id.0, "employee restored");
    active_employee(&state, &id).await.map(Json)
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    pub employee_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceInput {
    pub employee_id: String,
    pub work_date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub remarks: Option<String>,
}

pub async fn list_attendance(
    State(state): State<ApiState>,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<Vec<AttendanceRecord>> {
    let employee_id = query.employee_id.map(EmployeeId);
    SqlAttendanceRepository::new(state.db_pool.clone())
        .list(employee_id.as_ref(), query.from, query.to)
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn record_attendance(
    State(state): State<ApiState>,
    Json(input): Json<AttendanceInput>,
) -> Result<(StatusCode, Json<AttendanceRecord>), ApiError> {
    let employee = active_employee(&state, &EmployeeId(input.employee_id)).await?;
    let record = AttendanceRecord {
        id: AttendanceId(new_id()),
        employee_id: employee.id,
        work_date: input.work_date,
        status: input.status,
        time_in: input.time_in,
        time_out: input.time_out,
        remarks: input.remarks,
        created_at: Utc::now(),
    };
    record.validate().map_err(|error| failure(error.into()))?;
    SqlAttendanceRepository::new(state.db_pool.clone())
        .insert(&record)
        .await
        .map_err(|error| failure(error.into()))?;
    Ok((StatusCode::CREATED, Json(record)))
}

// ---------------------------------------------------------------------------
// Leave requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LeaveUpdate {
    #[serde(flatten)]
    pub draft: LeaveDraft,
    pub expected_version: Option<i64>,
}

async fn active_leave(state: &ApiState, id: &str) -> Result<LeaveRequest, ApiError> {
    SqlLeaveRepository::new(state.db_pool.clone())
        .find_by_id(&LeaveId(id.to_string()))
        .await
        .map_err(|error| failure(error.into()))?
        .filter(|leave| leave.lifecycle.is_active())
        .ok_or_else(|| failure(ApplicationError::not_found(EntityKind::Leave.as_str(), id)))
}

pub async fn list_leaves(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<LeaveRequest>> {
    SqlLeaveRepository::new(state.db_pool.clone())
        .list(&query.into())
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn create_leave(
    State(state): State<ApiState>,
    Json(draft): Json<LeaveDraft>,
) -> Result<(StatusCode, Json<LeaveRequest>), ApiError> {
    active_employee(&state, &draft.employee_id).await?;
    let leave = LeaveRequest::create(LeaveId(new_id()), draft, Utc::now())
        .map_err(|error| failure(error.into()))?;
    SqlLeaveRepository::new(state.db_pool.clone())
        .insert(&leave)
        .await
        .map_err(|error| failure(error.into()))?;

    info!(
        event_name = "hr.leave.created",
        leave_id = %leave.id.0,
        employee_id = %leave.employee_id.0,
        days = leave.days(),
        "leave request filed"
    );
    Ok((StatusCode::CREATED, Json(leave)))
}

pub async fn get_leave(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<LeaveRequest> {
    active_leave(&state, &id).await.map(Json)
}

pub async fn update_leave(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(update): Json<LeaveUpdate>,
) -> ApiResult<LeaveRequest> {
    let mut leave = active_leave(&state, &id).await?;
    let expected_version = update.expected_version.unwrap_or(leave.version);
    if update.draft.employee_id != leave.employee_id {
        active_employee(&state, &update.draft.employee_id).await?;
    }
    leave.revise(update.draft, Utc::now()).map_err(|error| failure(error.into()))?;
    SqlLeaveRepository::new(state.db_pool.clone())
        .update(&leave, expected_version)
        .await
        .map_err(|error| failure(error.into()))?;
    leave.version = expected_version + 1;
    Ok(Json(leave))
}

pub async fn delete_leave(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .workflow
        .soft_delete(EntityKind::Leave, &id)
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        Json,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use erpflow_core::domain::attendance::AttendanceStatus;
    use erpflow_core::domain::employee::{EmployeeDraft, EmployeeId};
    use erpflow_core::domain::leave::{LeaveDraft, LeaveStatus, LeaveType};

    use super::*;
    use crate::api::test_support::state;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn employee_draft(no: &str) -> EmployeeDraft {
        EmployeeDraft {
            employee_no: no.to_string(),
            first_name: "Jose".to_string(),
            last_name: "Cruz".to_string(),
            department: "Bakery".to_string(),
            position: "Mixer".to_string(),
            monthly_salary: Decimal::new(22_000, 0),
            hired_on: date(2025, 2, 3),
        }
    }

    #[tokio::test]
    async fn deleted_employee_is_hidden_until_restored() {
        let (state, _pool) = state().await;
        let (status, Json(employee)) =
            create_employee(State(state.clone()), Json(employee_draft("E-1")))
                .await
                .expect("create");
        assert_eq!(status, StatusCode::CREATED);

        let status = delete_employee(State(state.clone()), Path(employee.id.0.clone()))
            .await
            .expect("delete");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = get_employee(State(state.clone()), Path(employee.id.0.clone()))
            .await
            .expect_err("hidden");
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = delete_employee(State(state.clone()), Path(employee.id.0.clone()))
            .await
            .expect_err("already deleted");
        assert_eq!(status, StatusCode::NOT_FOUND);

        let Json(restored) = restore_employee(State(state.clone()), Path(employee.id.0.clone()))
            .await
            .expect("restore");
        assert!(restored.lifecycle.is_active());

        let Json(listed) = list_employees(State(state)).await.expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_attendance_for_same_day_is_bad_request() {
        let (state, _pool) = state().await;
        let (_, Json(employee)) =
            create_employee(State(state.clone()), Json(employee_draft("E-2")))
                .await
                .expect("create");

        let input = || AttendanceInput {
            employee_id: employee.id.0.clone(),
            work_date: date(2026, 3, 2),
            status: AttendanceStatus::Absent,
            time_in: None,
            time_out: None,
            remarks: None,
        };
        let (status, Json(first)) =
            record_attendance(State(state.clone()), Json(input())).await.expect("first");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first.status, AttendanceStatus::Absent);
        let (status, Json(body)) =
            record_attendance(State(state.clone()), Json(input())).await.expect_err("duplicate");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.kind, "validation");

        let Json(rows) = list_attendance(
            State(state),
            Query(AttendanceQuery {
                employee_id: Some(employee.id.0.clone()),
                from: None,
                to: None,
            }),
        )
        .await
        .expect("list");
        assert_eq!(rows, vec![first]);
    }

    #[tokio::test]
    async fn leave_edits_are_version_checked_and_frozen_after_decision() {
        let (state, _pool) = state().await;
        let (_, Json(employee)) =
            create_employee(State(state.clone()), Json(employee_draft("E-3")))
                .await
                .expect("create");
        let draft = LeaveDraft {
            employee_id: employee.id.clone(),
            leave_type: LeaveType::Vacation,
            start_date: date(2026, 4, 6),
            end_date: date(2026, 4, 8),
            reason: "beach".to_string(),
        };

        let (_, Json(leave)) =
            create_leave(State(state.clone()), Json(draft.clone())).await.expect("create leave");
        assert_eq!(leave.status, LeaveStatus::Pending);

        let Json(edited) = update_leave(
            State(state.clone()),
            Path(leave.id.0.clone()),
            Json(LeaveUpdate {
                draft: LeaveDraft { reason: "mountains".to_string(), ..draft.clone() },
                expected_version: Some(1),
            }),
        )
        .await
        .expect("edit");
        assert_eq!(edited.version, 2);

        let (status, _) = update_leave(
            State(state.clone()),
            Path(leave.id.0.clone()),
            Json(LeaveUpdate { draft: draft.clone(), expected_version: Some(1) }),
        )
        .await
        .expect_err("stale");
        assert_eq!(status, StatusCode::CONFLICT);

        let unknown = LeaveDraft { employee_id: EmployeeId("ghost".to_string()), ..draft };
        let (status, _) =
            create_leave(State(state), Json(unknown)).await.expect_err("unknown employee");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
