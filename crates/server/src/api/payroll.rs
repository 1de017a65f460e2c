use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use erpflow_core::audit::{AuditEntry, AuditQuery};
use erpflow_core::domain::employee::EmployeeId;
use erpflow_core::domain::payroll::{PayPeriod, PayrollId, PayrollRecord};
use erpflow_core::errors::ApplicationError;
use erpflow_core::payroll::{compute_payroll, PayrollBreakdown};
use erpflow_core::workflow::states::EntityKind;
use erpflow_db::repositories::{
    AuditLogRepository, PayrollRepository, SqlAuditLogRepository, SqlPayrollRepository,
};

use super::hr::active_employee;
use super::{failure, new_id, ApiError, ApiResult, ApiState, ListQuery};

#[derive(Debug, Deserialize)]
pub struct CreatePayroll {
    pub employee_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Defaults to the employee's monthly salary.
    pub gross_pay: Option<Decimal>,
}

/// Replaces the period and recomputes the figures of a draft payroll.
#[derive(Debug, Deserialize)]
pub struct UpdatePayroll {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Defaults to the employee's monthly salary.
    pub gross_pay: Option<Decimal>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewPayroll {
    pub gross_pay: Decimal,
}

async fn active_payroll(state: &ApiState, id: &str) -> Result<PayrollRecord, ApiError> {
    SqlPayrollRepository::new(state.db_pool.clone())
        .find_by_id(&PayrollId(id.to_string()))
        .await
        .map_err(|error| failure(error.into()))?
        .filter(|payroll| payroll.lifecycle.is_active())
        .ok_or_else(|| failure(ApplicationError::not_found(EntityKind::Payroll.as_str(), id)))
}

pub async fn list_payrolls(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<PayrollRecord>> {
    SqlPayrollRepository::new(state.db_pool.clone())
        .list(&query.into())
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn create_payroll(
    State(state): State<ApiState>,
    Json(input): Json<CreatePayroll>,
) -> Result<(StatusCode, Json<PayrollRecord>), ApiError> {
    let employee = active_employee(&state, &EmployeeId(input.employee_id)).await?;
    let period = PayPeriod::new(input.period_start, input.period_end)
        .map_err(|error| failure(error.into()))?;
    let gross_pay = input.gross_pay.unwrap_or(employee.monthly_salary);
    let breakdown =
        compute_payroll(gross_pay, &state.schedule).map_err(|error| failure(error.into()))?;

    let payroll = PayrollRecord::draft(PayrollId(new_id()), employee.id, period, breakdown, Utc::now());
    SqlPayrollRepository::new(state.db_pool.clone())
        .insert(&payroll)
        .await
        .map_err(|error| failure(error.into()))?;

    info!(
        event_name = "payroll.record.created",
        payroll_id = %payroll.id.0,
        employee_id = %payroll.employee_id.0,
        gross_pay = %payroll.gross_pay,
        net_pay = %payroll.net_pay,
        "payroll drafted"
    );
    Ok((StatusCode::CREATED, Json(payroll)))
}

/// Computes a breakdown without persisting anything.
pub async fn preview_payroll(
    State(state): State<ApiState>,
    Json(input): Json<PreviewPayroll>,
) -> ApiResult<PayrollBreakdown> {
    compute_payroll(input.gross_pay, &state.schedule)
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn get_payroll(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<PayrollRecord> {
    active_payroll(&state, &id).await.map(Json)
}

pub async fn update_payroll(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePayroll>,
) -> ApiResult<PayrollRecord> {
    let mut payroll = active_payroll(&state, &id).await?;
    let expected_version = input.expected_version.unwrap_or(payroll.version);
    let period = PayPeriod::new(input.period_start, input.period_end)
        .map_err(|error| failure(error.into()))?;
    let gross_pay = match input.gross_pay {
        Some(gross_pay) => gross_pay,
        None => active_employee(&state, &payroll.employee_id).await?.monthly_salary,
    };
    let breakdown =
        compute_payroll(gross_pay, &state.schedule).map_err(|error| failure(error.into()))?;

    payroll.revise(period, breakdown, Utc::now()).map_err(|error| failure(error.into()))?;
    SqlPayrollRepository::new(state.db_pool.clone())
        .update(&payroll, expected_version)
        .await
        .map_err(|error| failure(error.into()))?;
    payroll.version = expected_version + 1;

    info!(
        event_name = "payroll.record.updated",
        payroll_id = %payroll.id.0,
        gross_pay = %payroll.gross_pay,
        net_pay = %payroll.net_pay,
        version = payroll.version,
        "payroll draft revised"
    );
    Ok(Json(payroll))
}

pub async fn delete_payroll(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .workflow
        .soft_delete(EntityKind::Payroll, &id)
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Audit trail of one payroll, oldest first. Deleted payrolls keep theirs.
pub async fn payroll_audit_logs(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<AuditEntry>> {
    state.workflow.snapshot(EntityKind::Payroll, &id).await.map_err(failure)?;
    SqlAuditLogRepository::new(state.db_pool.clone())
        .query(&AuditQuery::for_entity(EntityKind::Payroll, id))
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}
