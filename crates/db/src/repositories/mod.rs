use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use erpflow_core::audit::{AuditEntry, AuditQuery};
use erpflow_core::domain::attendance::AttendanceRecord;
use erpflow_core::domain::branch_distribution::{BranchDistributionId, BranchDistributionRequest};
use erpflow_core::domain::employee::{Employee, EmployeeId};
use erpflow_core::domain::leave::{LeaveId, LeaveRequest};
use erpflow_core::domain::payroll::{PayrollId, PayrollRecord};
use erpflow_core::domain::scm_request::{ScmRequest, ScmRequestId};
use erpflow_core::errors::ApplicationError;

pub mod attendance;
pub mod audit_log;
pub mod branch_distribution;
pub mod employee;
pub mod leave;
pub mod payroll;
pub(crate) mod rows;
pub mod scm_request;
pub mod workflow_store;

pub use attendance::SqlAttendanceRepository;
pub use audit_log::SqlAuditLogRepository;
pub use branch_distribution::SqlBranchDistributionRepository;
pub use employee::SqlEmployeeRepository;
pub use leave::SqlLeaveRepository;
pub use payroll::SqlPayrollRepository;
pub use scm_request::SqlScmRequestRepository;
pub use workflow_store::SqlWorkflowStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} `{id}` is no longer at version {expected}")]
    VersionConflict { entity: &'static str, id: String, expected: i64 },
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(error) => {
                error.as_database_error().is_some_and(|database| database.is_unique_violation())
            }
            _ => false,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        if value.is_unique_violation() {
            return ApplicationError::validation(format!("duplicate value: {value}"));
        }
        match value {
            RepositoryError::NotFound { entity, id } => ApplicationError::not_found(entity, id),
            RepositoryError::VersionConflict { entity, id, expected } => {
                ApplicationError::Conflict { entity: entity.to_string(), id, expected }
            }
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Optional narrowing for list queries. Lists never include soft-deleted rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: Option<String>,
    pub employee_id: Option<String>,
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Returns the row whether or not it is soft-deleted.
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError>;
    async fn update(&self, employee: &Employee) -> Result<(), RepositoryError>;
    async fn soft_delete(&self, id: &EmployeeId, at: DateTime<Utc>)
        -> Result<(), RepositoryError>;
    async fn restore(&self, id: &EmployeeId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find(
        &self,
        employee_id: &EmployeeId,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepositoryError>;

    async fn list(
        &self,
        employee_id: Option<&EmployeeId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), RepositoryError>;

    /// Inserts unless the employee already has a row for that date.
    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn find_by_id(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError>;
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<LeaveRequest>, RepositoryError>;
    async fn insert(&self, leave: &LeaveRequest) -> Result<(), RepositoryError>;
    async fn update(&self, leave: &LeaveRequest, expected_version: i64)
        -> Result<(), RepositoryError>;
    async fn has_approved_covering(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    async fn find_by_id(&self, id: &PayrollId) -> Result<Option<PayrollRecord>, RepositoryError>;
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PayrollRecord>, RepositoryError>;
    async fn insert(&self, payroll: &PayrollRecord) -> Result<(), RepositoryError>;
    async fn update(&self, payroll: &PayrollRecord, expected_version: i64)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ScmRequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &ScmRequestId) -> Result<Option<ScmRequest>, RepositoryError>;
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ScmRequest>, RepositoryError>;
    async fn insert(&self, request: &ScmRequest) -> Result<(), RepositoryError>;
    async fn update(&self, request: &ScmRequest, expected_version: i64)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BranchDistributionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &BranchDistributionId,
    ) -> Result<Option<BranchDistributionRequest>, RepositoryError>;
    async fn list(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<BranchDistributionRequest>, RepositoryError>;
    async fn insert(&self, request: &BranchDistributionRequest) -> Result<(), RepositoryError>;
    async fn update(
        &self,
        request: &BranchDistributionRequest,
        expected_version: i64,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;
    /// Matching entries, oldest first.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, RepositoryError>;
}
