pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod payroll;
pub mod workflow;

pub use audit::{AuditEntry, AuditQuery};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::attendance::{AttendanceId, AttendanceRecord, AttendanceStatus};
pub use domain::branch_distribution::{
    BranchDistributionId, BranchDistributionRequest, BranchDistributionStatus,
};
pub use domain::employee::{Employee, EmployeeId};
pub use domain::leave::{LeaveId, LeaveRequest, LeaveStatus};
pub use domain::lifecycle::Lifecycle;
pub use domain::payroll::{PayrollId, PayrollRecord, PayrollStatus};
pub use domain::scm_request::{ScmRequest, ScmRequestId, ScmRequestStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use payroll::{compute_payroll, compute_withholding_tax, DeductionSchedule, PayrollBreakdown};
pub use workflow::{
    EntityKind, TransitionOutcome, TransitionRequest, WorkflowAction, WorkflowEngine,
    WorkflowError, WorkflowSnapshot, WorkflowStatus,
};
