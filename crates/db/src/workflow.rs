use chrono::Utc;
use tracing::{info, warn};

use erpflow_core::audit::AuditEntry;
use erpflow_core::config::AuditConfig;
use erpflow_core::domain::lifecycle::Lifecycle;
use erpflow_core::errors::ApplicationError;
use erpflow_core::workflow::states::{
    EntityKind, TransitionOutcome, TransitionRequest, WorkflowAction, WorkflowSnapshot,
    WorkflowStatus,
};
use erpflow_core::workflow::{available_actions, transition};

use crate::repositories::SqlWorkflowStore;
use crate::DbPool;

/// Result of an applied action: what changed and the record's new state.
#[derive(Clone, Debug)]
pub struct AppliedTransition {
    pub outcome: TransitionOutcome<WorkflowStatus>,
    pub snapshot: WorkflowSnapshot<WorkflowStatus>,
    pub audit: Option<AuditEntry>,
}

/// Runs workflow actions against stored records. Every action loads the
/// current snapshot, validates it through the engine, and persists the
/// outcome and its audit entry atomically.
pub struct WorkflowService {
    store: SqlWorkflowStore,
    audit: AuditConfig,
}

impl WorkflowService {
    pub fn new(pool: DbPool, audit: AuditConfig) -> Self {
        Self { store: SqlWorkflowStore::new(pool), audit }
    }

    pub async fn snapshot(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<WorkflowSnapshot<WorkflowStatus>, ApplicationError> {
        self.store
            .load_snapshot(kind, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found(kind.as_str(), id))
    }

    pub async fn allowed_actions(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Vec<WorkflowAction>, ApplicationError> {
        Ok(available_actions(&self.snapshot(kind, id).await?))
    }

    /// Applies `action` to `(kind, id)`. When `expected_version` is given it
    /// must match the stored version; otherwise the version read here guards
    /// the write.
    pub async fn apply(
        &self,
        kind: EntityKind,
        id: &str,
        action: WorkflowAction,
        request: TransitionRequest,
        expected_version: Option<i64>,
    ) -> Result<AppliedTransition, ApplicationError> {
        let snapshot = self.snapshot(kind, id).await?;
        let version = expected_version.unwrap_or(snapshot.version);
        if version != snapshot.version {
            warn!(
                event_name = "workflow.transition.stale",
                entity_kind = kind.as_str(),
                entity_id = id,
                action = action.as_str(),
                expected_version = version,
                current_version = snapshot.version,
                "workflow action refused on stale version"
            );
            return Err(ApplicationError::Conflict {
                entity: kind.as_str().to_string(),
                id: id.to_string(),
                expected: version,
            });
        }

        let outcome = match transition(&snapshot, action, &request) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "workflow.transition.rejected",
                    entity_kind = kind.as_str(),
                    entity_id = id,
                    action = action.as_str(),
                    from_status = snapshot.status.as_str(),
                    actor_id = %request.actor_id,
                    error = %error,
                    "workflow action rejected"
                );
                return Err(error.into());
            }
        };

        let audit = self
            .audit
            .audits(kind)
            .then(|| AuditEntry::for_transition(&outcome, &request));
        let new_version = self.store.apply_outcome(&outcome, version, audit.as_ref()).await?;

        info!(
            event_name = "workflow.transition.applied",
            entity_kind = kind.as_str(),
            entity_id = id,
            action = action.as_str(),
            from_status = outcome.from.as_str(),
            to_status = outcome.to.as_str(),
            actor_id = %outcome.actor_id,
            version = new_version,
            audited = audit.is_some(),
            "workflow action applied"
        );

        let lifecycle = if outcome.restores {
            Lifecycle::Active
        } else {
            snapshot.lifecycle
        };
        let next = WorkflowSnapshot {
            kind,
            entity_id: id.to_string(),
            status: outcome.to,
            lifecycle,
            version: new_version,
        };
        Ok(AppliedTransition { outcome, snapshot: next, audit })
    }

    /// Soft-deletes a workflow record; it stays restorable via `restore`.
    pub async fn soft_delete(&self, kind: EntityKind, id: &str) -> Result<(), ApplicationError> {
        self.store.soft_delete(kind, id, Utc::now()).await?;
        info!(
            event_name = "workflow.record.deleted",
            entity_kind = kind.as_str(),
            entity_id = id,
            "record soft-deleted"
        );
        Ok(())
    }
}
