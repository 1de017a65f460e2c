use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::lifecycle::Lifecycle;
use crate::errors::DomainError;
use crate::workflow::states::WorkflowState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaveId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl WorkflowState for LeaveStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    Vacation,
    Sick,
    Emergency,
    Maternity,
    Paternity,
    Unpaid,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacation => "Vacation",
            Self::Sick => "Sick",
            Self::Emergency => "Emergency",
            Self::Maternity => "Maternity",
            Self::Paternity => "Paternity",
            Self::Unpaid => "Unpaid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Vacation" => Some(Self::Vacation),
            "Sick" => Some(Self::Sick),
            "Emergency" => Some(Self::Emergency),
            "Maternity" => Some(Self::Maternity),
            "Paternity" => Some(Self::Paternity),
            "Unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub employee_id: EmployeeId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub version: i64,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or editing a leave request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDraft {
    pub employee_id: EmployeeId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl LeaveDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.employee_id.0.trim().is_empty() {
            return Err(DomainError::Validation("leave.employee_id is required".to_string()));
        }
        if self.end_date < self.start_date {
            return Err(DomainError::Validation(format!(
                "leave end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

impl LeaveRequest {
    pub fn create(id: LeaveId, draft: LeaveDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        draft.validate()?;
        Ok(Self {
            id,
            employee_id: draft.employee_id,
            leave_type: draft.leave_type,
            start_date: draft.start_date,
            end_date: draft.end_date,
            reason: draft.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejected_at: None,
            remarks: None,
            version: 1,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Editing is only allowed while the request still awaits a decision.
    pub fn revise(&mut self, draft: LeaveDraft, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != LeaveStatus::Pending {
            return Err(DomainError::Validation(format!(
                "leave request `{}` can no longer be edited in status {}",
                self.id.0,
                self.status.as_str()
            )));
        }
        draft.validate()?;
        self.employee_id = draft.employee_id;
        self.leave_type = draft.leave_type;
        self.start_date = draft.start_date;
        self.end_date = draft.end_date;
        self.reason = draft.reason;
        self.updated_at = now;
        Ok(())
    }

    /// Inclusive number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
