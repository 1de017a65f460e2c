use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Late => "Late",
            Self::Absent => "Absent",
            Self::OnLeave => "OnLeave",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Present" => Some(Self::Present),
            "Late" => Some(Self::Late),
            "Absent" => Some(Self::Absent),
            "OnLeave" => Some(Self::OnLeave),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub employee_id: EmployeeId,
    pub work_date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.status, self.time_in, self.time_out) {
            (AttendanceStatus::Absent | AttendanceStatus::OnLeave, Some(_), _)
            | (AttendanceStatus::Absent | AttendanceStatus::OnLeave, _, Some(_)) => {
                Err(DomainError::Validation(format!(
                    "attendance status {} cannot carry clock times",
                    self.status.as_str()
                )))
            }
            (_, Some(time_in), Some(time_out)) if time_out < time_in => Err(
                DomainError::Validation("attendance time_out is before time_in".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Placeholder row written by the absence backfill.
    pub fn system_marked(
        id: AttendanceId,
        employee_id: EmployeeId,
        work_date: NaiveDate,
        status: AttendanceStatus,
        remarks: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            employee_id,
            work_date,
            status,
            time_in: None,
            time_out: None,
            remarks: Some(remarks.into()),
            created_at: now,
        }
    }
}
