use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::branch_distribution::BranchDistributionStatus;
use crate::domain::leave::LeaveStatus;
use crate::domain::lifecycle::Lifecycle;
use crate::domain::payroll::PayrollStatus;
use crate::domain::scm_request::ScmRequestStatus;
use crate::errors::DomainError;

/// The request-like entities whose lifecycle is governed by a status field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Leave,
    Payroll,
    ScmRequest,
    BranchDistribution,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] =
        [Self::Leave, Self::Payroll, Self::ScmRequest, Self::BranchDistribution];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::Payroll => "payroll",
            Self::ScmRequest => "scm_request",
            Self::BranchDistribution => "branch_distribution",
        }
    }

    /// Path segment used by the REST surface (`/api/{resource}`).
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Leave => "leaves",
            Self::Payroll => "payrolls",
            Self::ScmRequest => "scm-requests",
            Self::BranchDistribution => "branch-distribution-requests",
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.resource() == resource)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| DomainError::Validation(format!("unknown entity kind `{value}`")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Reject,
    Process,
    Cancel,
    Fulfill,
    Restore,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 7] = [
        Self::Submit,
        Self::Approve,
        Self::Reject,
        Self::Process,
        Self::Cancel,
        Self::Fulfill,
        Self::Restore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Process => "process",
            Self::Cancel => "cancel",
            Self::Fulfill => "fulfill",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == key)
            .ok_or_else(|| DomainError::Validation(format!("unknown workflow action `{value}`")))
    }
}

/// Behaviour shared by every per-entity status enum.
pub trait WorkflowState: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;
    fn parse(value: &str) -> Option<Self>;
    fn is_terminal(&self) -> bool;
}

/// Status of any workflow entity, tagged by its entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Leave(LeaveStatus),
    Payroll(PayrollStatus),
    ScmRequest(ScmRequestStatus),
    BranchDistribution(BranchDistributionStatus),
}

impl WorkflowStatus {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Leave(_) => EntityKind::Leave,
            Self::Payroll(_) => EntityKind::Payroll,
            Self::ScmRequest(_) => EntityKind::ScmRequest,
            Self::BranchDistribution(_) => EntityKind::BranchDistribution,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave(status) => status.as_str(),
            Self::Payroll(status) => status.as_str(),
            Self::ScmRequest(status) => status.as_str(),
            Self::BranchDistribution(status) => status.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Leave(status) => status.is_terminal(),
            Self::Payroll(status) => status.is_terminal(),
            Self::ScmRequest(status) => status.is_terminal(),
            Self::BranchDistribution(status) => status.is_terminal(),
        }
    }

    pub fn parse(kind: EntityKind, value: &str) -> Option<Self> {
        match kind {
            EntityKind::Leave => LeaveStatus::parse(value).map(Self::Leave),
            EntityKind::Payroll => PayrollStatus::parse(value).map(Self::Payroll),
            EntityKind::ScmRequest => ScmRequestStatus::parse(value).map(Self::ScmRequest),
            EntityKind::BranchDistribution => {
                BranchDistributionStatus::parse(value).map(Self::BranchDistribution)
            }
        }
    }
}

/// Columns a transition may write besides `status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampColumn {
    SubmittedAt,
    ApprovedAt,
    RejectedAt,
    ProcessedAt,
    CancelledAt,
    CanceledAt,
    FulfilledAt,
    ApprovedBy,
    ApproverId,
    ProcessedBy,
    FulfilledBy,
    RejectionReason,
    CancellationReason,
    Remarks,
}

impl StampColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmittedAt => "submitted_at",
            Self::ApprovedAt => "approved_at",
            Self::RejectedAt => "rejected_at",
            Self::ProcessedAt => "processed_at",
            Self::CancelledAt => "cancelled_at",
            Self::CanceledAt => "canceled_at",
            Self::FulfilledAt => "fulfilled_at",
            Self::ApprovedBy => "approved_by",
            Self::ApproverId => "approver_id",
            Self::ProcessedBy => "processed_by",
            Self::FulfilledBy => "fulfilled_by",
            Self::RejectionReason => "rejection_reason",
            Self::CancellationReason => "cancellation_reason",
            Self::Remarks => "remarks",
        }
    }

    /// Stamps are set once at the moment of their transition and never
    /// overwritten afterwards. Remarks are free text and follow the latest action.
    pub fn is_write_once(&self) -> bool {
        !matches!(self, Self::Remarks)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Timestamp(DateTime<Utc>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub column: StampColumn,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn timestamp(column: StampColumn, at: DateTime<Utc>) -> Self {
        Self { column, value: FieldValue::Timestamp(at) }
    }

    pub fn text(column: StampColumn, value: impl Into<String>) -> Self {
        Self { column, value: FieldValue::Text(value.into()) }
    }
}

/// Who is acting, why, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub actor_id: String,
    pub reason: Option<String>,
    pub remarks: Option<String>,
    pub at: DateTime<Utc>,
}

impl TransitionRequest {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self { actor_id: actor_id.into(), reason: None, remarks: None, at: Utc::now() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    /// Reason text with surrounding whitespace removed; blank counts as absent.
    pub fn reason_text(&self) -> Option<&str> {
        self.reason.as_deref().map(str::trim).filter(|reason| !reason.is_empty())
    }

    pub fn remarks_text(&self) -> Option<&str> {
        self.remarks.as_deref().map(str::trim).filter(|remarks| !remarks.is_empty())
    }
}

/// The workflow-relevant slice of a stored record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot<S> {
    pub kind: EntityKind,
    pub entity_id: String,
    pub status: S,
    pub lifecycle: Lifecycle,
    pub version: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome<S> {
    pub kind: EntityKind,
    pub entity_id: String,
    pub from: S,
    pub to: S,
    pub action: WorkflowAction,
    pub actor_id: String,
    pub updates: Vec<FieldUpdate>,
    /// Set when the transition clears `deleted_at`.
    pub restores: bool,
    pub at: DateTime<Utc>,
}

impl<S> TransitionOutcome<S> {
    pub fn map_status<T>(self, map: impl Fn(S) -> T) -> TransitionOutcome<T> {
        TransitionOutcome {
            kind: self.kind,
            entity_id: self.entity_id,
            from: map(self.from),
            to: map(self.to),
            action: self.action,
            actor_id: self.actor_id,
            updates: self.updates,
            restores: self.restores,
            at: self.at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, StampColumn, TransitionRequest, WorkflowAction, WorkflowStatus};
    use crate::domain::branch_distribution::BranchDistributionStatus;
    use crate::domain::payroll::PayrollStatus;

    #[test]
    fn resources_map_back_to_entity_kinds() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_resource(kind.resource()), Some(kind));
        }
        assert_eq!(EntityKind::from_resource("invoices"), None);
    }

    #[test]
    fn actions_parse_case_insensitively() {
        assert_eq!("Approve".parse::<WorkflowAction>().expect("parse"), WorkflowAction::Approve);
        assert!("escalate".parse::<WorkflowAction>().is_err());
    }

    #[test]
    fn statuses_parse_with_the_stored_spelling_of_each_entity() {
        assert_eq!(
            WorkflowStatus::parse(EntityKind::Payroll, "Submitted"),
            Some(WorkflowStatus::Payroll(PayrollStatus::Submitted))
        );
        assert_eq!(
            WorkflowStatus::parse(EntityKind::BranchDistribution, "canceled"),
            Some(WorkflowStatus::BranchDistribution(BranchDistributionStatus::Canceled))
        );
        assert_eq!(WorkflowStatus::parse(EntityKind::BranchDistribution, "Canceled"), None);
        assert_eq!(WorkflowStatus::parse(EntityKind::Leave, "Processed"), None);
    }

    #[test]
    fn blank_reason_is_treated_as_absent() {
        let request = TransitionRequest::new("u-1").with_reason("   ");
        assert_eq!(request.reason_text(), None);
        assert!(!StampColumn::Remarks.is_write_once());
        assert!(StampColumn::ApprovedAt.is_write_once());
    }
}
