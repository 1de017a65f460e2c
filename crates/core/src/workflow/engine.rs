use thiserror::Error;

use crate::domain::branch_distribution::BranchDistributionStatus;
use crate::domain::leave::LeaveStatus;
use crate::domain::lifecycle::Lifecycle;
use crate::domain::payroll::PayrollStatus;
use crate::domain::scm_request::ScmRequestStatus;
use crate::workflow::states::{
    EntityKind, FieldUpdate, StampColumn, TransitionOutcome, TransitionRequest, WorkflowAction,
    WorkflowSnapshot, WorkflowState, WorkflowStatus,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("invalid {kind} transition: cannot {action} from {from}")]
    InvalidTransition { kind: EntityKind, from: String, action: WorkflowAction },
    #[error("{kind} {action} requires a reason")]
    MissingReason { kind: EntityKind, action: WorkflowAction },
    #[error("workflow actions require an actor id")]
    MissingActor,
}

impl WorkflowError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingReason { .. } | Self::MissingActor)
    }
}

/// Next status and the stamps an allowed action writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    pub to: S,
    pub updates: Vec<FieldUpdate>,
}

/// Allowed-transition table of one entity kind. Only sees active records;
/// soft-delete and restore are handled by [`WorkflowEngine`].
pub trait WorkflowDefinition: Send + Sync {
    type Status: WorkflowState;

    fn kind(&self) -> EntityKind;
    fn initial_status(&self) -> Self::Status;
    fn transition(
        &self,
        current: Self::Status,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<Transition<Self::Status>, WorkflowError>;
}

#[derive(Clone, Debug, Default)]
pub struct LeaveWorkflow;

impl WorkflowDefinition for LeaveWorkflow {
    type Status = LeaveStatus;

    fn kind(&self) -> EntityKind {
        EntityKind::Leave
    }

    fn initial_status(&self) -> LeaveStatus {
        LeaveStatus::Pending
    }

    fn transition(
        &self,
        current: LeaveStatus,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<Transition<LeaveStatus>, WorkflowError> {
        let (to, stamp) = match (current, action) {
            (LeaveStatus::Pending, WorkflowAction::Approve) => {
                (LeaveStatus::Approved, StampColumn::ApprovedAt)
            }
            (LeaveStatus::Pending, WorkflowAction::Reject) => {
                (LeaveStatus::Rejected, StampColumn::RejectedAt)
            }
            _ => return Err(invalid(self.kind(), current, action)),
        };

        let mut updates = vec![
            FieldUpdate::timestamp(stamp, request.at),
            FieldUpdate::text(StampColumn::ApprovedBy, request.actor_id.trim()),
        ];
        push_remarks(&mut updates, request);
        Ok(Transition { to, updates })
    }
}

#[derive(Clone, Debug, Default)]
pub struct PayrollWorkflow;

impl WorkflowDefinition for PayrollWorkflow {
    type Status = PayrollStatus;

    fn kind(&self) -> EntityKind {
        EntityKind::Payroll
    }

    fn initial_status(&self) -> PayrollStatus {
        PayrollStatus::Draft
    }

    fn transition(
        &self,
        current: PayrollStatus,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<Transition<PayrollStatus>, WorkflowError> {
        let actor = request.actor_id.trim();
        let (to, mut updates) = match (current, action) {
            (PayrollStatus::Draft, WorkflowAction::Submit) => (
                PayrollStatus::Submitted,
                vec![FieldUpdate::timestamp(StampColumn::SubmittedAt, request.at)],
            ),
            (PayrollStatus::Submitted, WorkflowAction::Approve) => (
                PayrollStatus::Approved,
                vec![
                    FieldUpdate::timestamp(StampColumn::ApprovedAt, request.at),
                    FieldUpdate::text(StampColumn::ApproverId, actor),
                ],
            ),
            (PayrollStatus::Submitted, WorkflowAction::Reject) => (
                PayrollStatus::Rejected,
                vec![
                    FieldUpdate::timestamp(StampColumn::RejectedAt, request.at),
                    FieldUpdate::text(StampColumn::ApproverId, actor),
                ],
            ),
            (PayrollStatus::Approved, WorkflowAction::Process) => (
                PayrollStatus::Processed,
                vec![
                    FieldUpdate::timestamp(StampColumn::ProcessedAt, request.at),
                    FieldUpdate::text(StampColumn::ProcessedBy, actor),
                ],
            ),
            _ => return Err(invalid(self.kind(), current, action)),
        };

        push_remarks(&mut updates, request);
        Ok(Transition { to, updates })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScmRequestWorkflow;

impl WorkflowDefinition for ScmRequestWorkflow {
    type Status = ScmRequestStatus;

    fn kind(&self) -> EntityKind {
        EntityKind::ScmRequest
    }

    fn initial_status(&self) -> ScmRequestStatus {
        ScmRequestStatus::Pending
    }

    fn transition(
        &self,
        current: ScmRequestStatus,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<Transition<ScmRequestStatus>, WorkflowError> {
        let actor = request.actor_id.trim();
        let (to, mut updates) = match (current, action) {
            (ScmRequestStatus::Pending, WorkflowAction::Submit) => (
                ScmRequestStatus::Submitted,
                vec![FieldUpdate::timestamp(StampColumn::SubmittedAt, request.at)],
            ),
            (ScmRequestStatus::Submitted, WorkflowAction::Approve) => (
                ScmRequestStatus::Approved,
                vec![
                    FieldUpdate::timestamp(StampColumn::ApprovedAt, request.at),
                    FieldUpdate::text(StampColumn::ApprovedBy, actor),
                ],
            ),
            (ScmRequestStatus::Submitted, WorkflowAction::Reject) => (
                ScmRequestStatus::Rejected,
                vec![
                    FieldUpdate::timestamp(StampColumn::RejectedAt, request.at),
                    FieldUpdate::text(StampColumn::ApprovedBy, actor),
                ],
            ),
            (ScmRequestStatus::Pending | ScmRequestStatus::Submitted, WorkflowAction::Cancel) => {
                let mut updates = vec![FieldUpdate::timestamp(StampColumn::CancelledAt, request.at)];
                if let Some(reason) = request.reason_text() {
                    updates.push(FieldUpdate::text(StampColumn::CancellationReason, reason));
                }
                (ScmRequestStatus::Cancelled, updates)
            }
            _ => return Err(invalid(self.kind(), current, action)),
        };

        push_remarks(&mut updates, request);
        Ok(Transition { to, updates })
    }
}

#[derive(Clone, Debug, Default)]
pub struct BranchDistributionWorkflow;

impl WorkflowDefinition for BranchDistributionWorkflow {
    type Status = BranchDistributionStatus;

    fn kind(&self) -> EntityKind {
        EntityKind::BranchDistribution
    }

    fn initial_status(&self) -> BranchDistributionStatus {
        BranchDistributionStatus::Pending
    }

    fn transition(
        &self,
        current: BranchDistributionStatus,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<Transition<BranchDistributionStatus>, WorkflowError> {
        use BranchDistributionStatus::{Approved, Canceled, Fulfilled, Pending, Rejected};

        let actor = request.actor_id.trim();
        let (to, updates) = match (current, action) {
            (Pending, WorkflowAction::Approve) => (
                Approved,
                vec![
                    FieldUpdate::timestamp(StampColumn::ApprovedAt, request.at),
                    FieldUpdate::text(StampColumn::ProcessedBy, actor),
                ],
            ),
            (Pending, WorkflowAction::Reject) => {
                let reason = request.reason_text().ok_or(WorkflowError::MissingReason {
                    kind: self.kind(),
                    action,
                })?;
                (
                    Rejected,
                    vec![
                        FieldUpdate::timestamp(StampColumn::RejectedAt, request.at),
                        FieldUpdate::text(StampColumn::ProcessedBy, actor),
                        FieldUpdate::text(StampColumn::RejectionReason, reason),
                    ],
                )
            }
            (Approved, WorkflowAction::Fulfill) => (
                Fulfilled,
                vec![
                    FieldUpdate::timestamp(StampColumn::FulfilledAt, request.at),
                    FieldUpdate::text(StampColumn::FulfilledBy, actor),
                ],
            ),
            (Pending | Approved, WorkflowAction::Cancel) => {
                (Canceled, vec![FieldUpdate::timestamp(StampColumn::CanceledAt, request.at)])
            }
            _ => return Err(invalid(self.kind(), current, action)),
        };

        Ok(Transition { to, updates })
    }
}

pub struct WorkflowEngine<D> {
    definition: D,
}

impl<D> Default for WorkflowEngine<D>
where
    D: WorkflowDefinition + Default,
{
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D> WorkflowEngine<D>
where
    D: WorkflowDefinition,
{
    pub fn new(definition: D) -> Self {
        Self { definition }
    }

    pub fn kind(&self) -> EntityKind {
        self.definition.kind()
    }

    pub fn initial_status(&self) -> D::Status {
        self.definition.initial_status()
    }

    pub fn apply(
        &self,
        snapshot: &WorkflowSnapshot<D::Status>,
        action: WorkflowAction,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome<D::Status>, WorkflowError> {
        if request.actor_id.trim().is_empty() {
            return Err(WorkflowError::MissingActor);
        }

        let kind = self.definition.kind();
        let (to, updates, restores) = match (snapshot.lifecycle, action) {
            (Lifecycle::Deleted { .. }, WorkflowAction::Restore) => {
                (snapshot.status, Vec::new(), true)
            }
            (Lifecycle::Deleted { .. }, _) => {
                return Err(WorkflowError::InvalidTransition {
                    kind,
                    from: format!("{} (deleted)", snapshot.status.as_str()),
                    action,
                })
            }
            (Lifecycle::Active, WorkflowAction::Restore) => {
                return Err(WorkflowError::InvalidTransition {
                    kind,
                    from: format!("{} (active)", snapshot.status.as_str()),
                    action,
                })
            }
            (Lifecycle::Active, _) => {
                let transition = self.definition.transition(snapshot.status, action, request)?;
                (transition.to, transition.updates, false)
            }
        };

        Ok(TransitionOutcome {
            kind,
            entity_id: snapshot.entity_id.clone(),
            from: snapshot.status,
            to,
            action,
            actor_id: request.actor_id.trim().to_string(),
            updates,
            restores,
            at: request.at,
        })
    }
}

/// Runtime dispatch over the tagged status of any workflow entity.
pub fn transition(
    snapshot: &WorkflowSnapshot<WorkflowStatus>,
    action: WorkflowAction,
    request: &TransitionRequest,
) -> Result<TransitionOutcome<WorkflowStatus>, WorkflowError> {
    match snapshot.status {
        WorkflowStatus::Leave(status) => WorkflowEngine::new(LeaveWorkflow)
            .apply(&retag(snapshot, status), action, request)
            .map(|outcome| outcome.map_status(WorkflowStatus::Leave)),
        WorkflowStatus::Payroll(status) => WorkflowEngine::new(PayrollWorkflow)
            .apply(&retag(snapshot, status), action, request)
            .map(|outcome| outcome.map_status(WorkflowStatus::Payroll)),
        WorkflowStatus::ScmRequest(status) => WorkflowEngine::new(ScmRequestWorkflow)
            .apply(&retag(snapshot, status), action, request)
            .map(|outcome| outcome.map_status(WorkflowStatus::ScmRequest)),
        WorkflowStatus::BranchDistribution(status) => WorkflowEngine::new(BranchDistributionWorkflow)
            .apply(&retag(snapshot, status), action, request)
            .map(|outcome| outcome.map_status(WorkflowStatus::BranchDistribution)),
    }
}

/// Actions that would currently succeed for the record, given a reason.
pub fn available_actions(snapshot: &WorkflowSnapshot<WorkflowStatus>) -> Vec<WorkflowAction> {
    let check = TransitionRequest::new("availability-check").with_reason("availability");
    WorkflowAction::ALL
        .into_iter()
        .filter(|action| transition(snapshot, *action, &check).is_ok())
        .collect()
}

fn retag<S, T>(snapshot: &WorkflowSnapshot<S>, status: T) -> WorkflowSnapshot<T> {
    WorkflowSnapshot {
        kind: snapshot.kind,
        entity_id: snapshot.entity_id.clone(),
        status,
        lifecycle: snapshot.lifecycle,
        version: snapshot.version,
    }
}

fn invalid<S: WorkflowState>(kind: EntityKind, current: S, action: WorkflowAction) -> WorkflowError {
    WorkflowError::InvalidTransition { kind, from: current.as_str().to_string(), action }
}

fn push_remarks(updates: &mut Vec<FieldUpdate>, request: &TransitionRequest) {
    if let Some(remarks) = request.remarks_text() {
        updates.push(FieldUpdate::text(StampColumn::Remarks, remarks));
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        available_actions, transition, BranchDistributionWorkflow, LeaveWorkflow,
        PayrollWorkflow, ScmRequestWorkflow, WorkflowEngine, WorkflowError,
    };
    use crate::audit::{AuditEntry, AuditQuery};
    use crate::domain::branch_distribution::BranchDistributionStatus;
    use crate::domain::leave::LeaveStatus;
    use crate::domain::lifecycle::Lifecycle;
    use crate::domain::payroll::PayrollStatus;
    use crate::domain::scm_request::ScmRequestStatus;
    use crate::workflow::states::{
        EntityKind, FieldUpdate, FieldValue, StampColumn, TransitionRequest, WorkflowAction,
        WorkflowSnapshot, WorkflowStatus,
    };

    fn snapshot<S>(kind: EntityKind, status: S) -> WorkflowSnapshot<S> {
        WorkflowSnapshot {
            kind,
            entity_id: "5".to_string(),
            status,
            lifecycle: Lifecycle::Active,
            version: 1,
        }
    }

    fn all_statuses() -> Vec<WorkflowStatus> {
        let mut statuses = Vec::new();
        statuses.extend(
            [LeaveStatus::Pending, LeaveStatus::Approved, LeaveStatus::Rejected]
                .map(WorkflowStatus::Leave),
        );
        statuses.extend(
            [
                PayrollStatus::Draft,
                PayrollStatus::Submitted,
                PayrollStatus::Approved,
                PayrollStatus::Rejected,
                PayrollStatus::Processed,
            ]
            .map(WorkflowStatus::Payroll),
        );
        statuses.extend(
            [
                ScmRequestStatus::Pending,
                ScmRequestStatus::Submitted,
                ScmRequestStatus::Approved,
                ScmRequestStatus::Rejected,
                ScmRequestStatus::Cancelled,
            ]
            .map(WorkflowStatus::ScmRequest),
        );
        statuses.extend(
            [
                BranchDistributionStatus::Pending,
                BranchDistributionStatus::Approved,
                BranchDistributionStatus::Rejected,
                BranchDistributionStatus::Fulfilled,
                BranchDistributionStatus::Canceled,
            ]
            .map(WorkflowStatus::BranchDistribution),
        );
        statuses
    }

    #[test]
    fn terminal_statuses_reject_every_action() {
        let request = TransitionRequest::new("u-admin").with_reason("because");
        for status in all_statuses().into_iter().filter(|status| status.is_terminal()) {
            let snapshot = snapshot(status.kind(), status);
            for action in WorkflowAction::ALL {
                let result = transition(&snapshot, action, &request);
                assert!(
                    matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                    "{status:?} should not allow {action}"
                );
            }
        }
    }

    #[test]
    fn deleted_records_only_allow_restore_and_keep_their_status() {
        let request = TransitionRequest::new("u-admin").with_reason("because");
        for status in all_statuses() {
            let mut snapshot = snapshot(status.kind(), status);
            snapshot.lifecycle = Lifecycle::Deleted { at: Utc::now() };

            let restored =
                transition(&snapshot, WorkflowAction::Restore, &request).expect("restore works");
            assert_eq!(restored.to, status);
            assert!(restored.restores);
            assert!(restored.updates.is_empty());

            assert_eq!(available_actions(&snapshot), vec![WorkflowAction::Restore]);
        }
    }

    #[test]
    fn restore_on_active_record_is_invalid() {
        let snapshot = snapshot(EntityKind::Leave, WorkflowStatus::Leave(LeaveStatus::Pending));
        let error = transition(&snapshot, WorkflowAction::Restore, &TransitionRequest::new("u-1"))
            .expect_err("restore requires deletion");
        assert!(matches!(error, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn leave_approval_stamps_time_and_approver() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).single().expect("time");
        let engine = WorkflowEngine::<LeaveWorkflow>::default();
        let outcome = engine
            .apply(
                &snapshot(EntityKind::Leave, LeaveStatus::Pending),
                WorkflowAction::Approve,
                &TransitionRequest::new(" u-hr ").at(at),
            )
            .expect("approve pending leave");

        assert_eq!(outcome.to, LeaveStatus::Approved);
        assert_eq!(outcome.actor_id, "u-hr");
        assert_eq!(
            outcome.updates,
            vec![
                FieldUpdate::timestamp(StampColumn::ApprovedAt, at),
                FieldUpdate::text(StampColumn::ApprovedBy, "u-hr"),
            ]
        );

        let again = engine.apply(
            &snapshot(EntityKind::Leave, LeaveStatus::Approved),
            WorkflowAction::Approve,
            &TransitionRequest::new("u-hr"),
        );
        assert!(matches!(again, Err(WorkflowError::InvalidTransition { .. })));
    }

    #[test]
    fn payroll_lifecycle_runs_draft_to_processed_with_audit() {
        let engine = WorkflowEngine::new(PayrollWorkflow);

        let submit = TransitionRequest::new("u-clerk").with_remarks("ready");
        let submitted = engine
            .apply(
                &snapshot(EntityKind::Payroll, PayrollStatus::Draft),
                WorkflowAction::Submit,
                &submit,
            )
            .expect("submit");
        assert_eq!(submitted.to, PayrollStatus::Submitted);

        let approve = TransitionRequest::new("u-manager");
        let approved = engine
            .apply(&snapshot(EntityKind::Payroll, submitted.to), WorkflowAction::Approve, &approve)
            .expect("approve");
        assert_eq!(approved.to, PayrollStatus::Approved);

        let resubmit = engine.apply(
            &snapshot(EntityKind::Payroll, approved.to),
            WorkflowAction::Submit,
            &TransitionRequest::new("u-clerk"),
        );
        assert!(matches!(resubmit, Err(WorkflowError::InvalidTransition { .. })));

        let processed = engine
            .apply(
                &snapshot(EntityKind::Payroll, approved.to),
                WorkflowAction::Process,
                &TransitionRequest::new("u-treasury"),
            )
            .expect("process");
        assert_eq!(processed.to, PayrollStatus::Processed);

        let entries = [
            AuditEntry::for_transition(&submitted, &submit),
            AuditEntry::for_transition(&approved, &approve),
        ];
        assert_eq!(entries[0].action, WorkflowAction::Submit);
        assert_eq!(entries[0].remarks.as_deref(), Some("ready"));
        assert_eq!(entries[0].created_at, submitted.at);
        assert_eq!(entries[1].action, WorkflowAction::Approve);
        assert_eq!(entries[1].remarks, None);

        let by_manager = AuditQuery::for_actor("u-manager");
        assert_eq!(entries.iter().filter(|entry| by_manager.matches(entry)).count(), 1);
        let by_entity = AuditQuery::for_entity(EntityKind::Payroll, submitted.entity_id.clone());
        assert!(entries.iter().all(|entry| by_entity.matches(entry)));
    }

    #[test]
    fn scm_cancel_records_optional_reason() {
        let engine = WorkflowEngine::new(ScmRequestWorkflow);
        let outcome = engine
            .apply(
                &snapshot(EntityKind::ScmRequest, ScmRequestStatus::Submitted),
                WorkflowAction::Cancel,
                &TransitionRequest::new("u-clerk").with_reason("duplicate request"),
            )
            .expect("cancel submitted request");

        assert_eq!(outcome.to, ScmRequestStatus::Cancelled);
        assert!(outcome.updates.iter().any(|update| update.column
            == StampColumn::CancellationReason
            && update.value == FieldValue::Text("duplicate request".to_string())));

        let approve_pending = engine.apply(
            &snapshot(EntityKind::ScmRequest, ScmRequestStatus::Pending),
            WorkflowAction::Approve,
            &TransitionRequest::new("u-manager"),
        );
        assert!(approve_pending.is_err(), "pending requests must be submitted first");
    }

    #[test]
    fn branch_rejection_requires_reason() {
        let engine = WorkflowEngine::new(BranchDistributionWorkflow);
        let pending = snapshot(EntityKind::BranchDistribution, BranchDistributionStatus::Pending);

        let missing = engine.apply(
            &pending,
            WorkflowAction::Reject,
            &TransitionRequest::new("u-commissary").with_reason("  "),
        );
        assert!(matches!(missing, Err(WorkflowError::MissingReason { .. })));

        let rejected = engine
            .apply(
                &pending,
                WorkflowAction::Reject,
                &TransitionRequest::new("u-commissary").with_reason("out of stock"),
            )
            .expect("reject with reason");
        assert_eq!(rejected.to, BranchDistributionStatus::Rejected);
        assert!(rejected
            .updates
            .iter()
            .any(|update| update.column == StampColumn::RejectedAt));
    }

    #[test]
    fn branch_fulfillment_requires_prior_approval() {
        let engine = WorkflowEngine::new(BranchDistributionWorkflow);
        let request = TransitionRequest::new("u-driver");

        let early = engine.apply(
            &snapshot(EntityKind::BranchDistribution, BranchDistributionStatus::Pending),
            WorkflowAction::Fulfill,
            &request,
        );
        assert!(early.is_err());

        let fulfilled = engine
            .apply(
                &snapshot(EntityKind::BranchDistribution, BranchDistributionStatus::Approved),
                WorkflowAction::Fulfill,
                &request,
            )
            .expect("fulfill approved request");
        assert_eq!(fulfilled.to, BranchDistributionStatus::Fulfilled);
    }

    #[test]
    fn blank_actor_is_rejected_before_the_table_is_consulted() {
        let result = transition(
            &snapshot(EntityKind::Payroll, WorkflowStatus::Payroll(PayrollStatus::Draft)),
            WorkflowAction::Submit,
            &TransitionRequest::new(""),
        );
        assert_eq!(result, Err(WorkflowError::MissingActor));
    }
}
