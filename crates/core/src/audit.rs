use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::states::{EntityKind, TransitionOutcome, TransitionRequest, WorkflowAction};

/// One row of the append-only workflow audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub actor_id: String,
    pub action: WorkflowAction,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: WorkflowAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_kind,
            entity_id: entity_id.into(),
            actor_id: actor_id.into(),
            action,
            remarks: None,
            created_at: Utc::now(),
        }
    }

    /// Entry for an applied transition. Remarks fall back to the reason
    /// so a rejection or cancellation keeps its explanation in the trail.
    pub fn for_transition<S>(outcome: &TransitionOutcome<S>, request: &TransitionRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_kind: outcome.kind,
            entity_id: outcome.entity_id.clone(),
            actor_id: outcome.actor_id.clone(),
            action: outcome.action,
            remarks: request.remarks_text().or_else(|| request.reason_text()).map(str::to_string),
            created_at: outcome.at,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub entity_kind: Option<EntityKind>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
}

impl AuditQuery {
    pub fn for_entity(kind: EntityKind, entity_id: impl Into<String>) -> Self {
        Self { entity_kind: Some(kind), entity_id: Some(entity_id.into()), actor_id: None }
    }

    pub fn for_actor(actor_id: impl Into<String>) -> Self {
        Self { actor_id: Some(actor_id.into()), ..Self::default() }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_kind.map_or(true, |kind| kind == entry.entity_kind)
            && self.entity_id.as_deref().map_or(true, |id| id == entry.entity_id)
            && self.actor_id.as_deref().map_or(true, |actor| actor == entry.actor_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::audit::{AuditEntry, AuditQuery};
    use crate::workflow::states::{
        EntityKind, TransitionOutcome, TransitionRequest, WorkflowAction,
    };

    #[test]
    fn query_filters_by_entity_and_actor() {
        let entries = [
            AuditEntry::new(EntityKind::Payroll, "PAY-1", "u-clerk", WorkflowAction::Submit),
            AuditEntry::new(EntityKind::Payroll, "PAY-1", "u-manager", WorkflowAction::Approve)
                .with_remarks("within budget"),
            AuditEntry::new(EntityKind::Payroll, "PAY-2", "u-clerk", WorkflowAction::Submit),
        ];
        let count = |query: AuditQuery| entries.iter().filter(|entry| query.matches(entry)).count();

        assert_eq!(count(AuditQuery::for_entity(EntityKind::Payroll, "PAY-1")), 2);
        assert_eq!(count(AuditQuery::for_actor("u-clerk")), 2);
        assert_eq!(count(AuditQuery::for_entity(EntityKind::Leave, "PAY-1")), 0);
        assert_eq!(count(AuditQuery::default()), 3);
        assert_eq!(entries[1].remarks.as_deref(), Some("within budget"));
    }

    #[test]
    fn transition_entry_falls_back_to_the_reason() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("timestamp");
        let outcome = TransitionOutcome {
            kind: EntityKind::Leave,
            entity_id: "LV-1".to_string(),
            from: "Pending",
            to: "Rejected",
            action: WorkflowAction::Reject,
            actor_id: "u-hr".to_string(),
            updates: Vec::new(),
            restores: false,
            at,
        };

        let entry = AuditEntry::for_transition(
            &outcome,
            &TransitionRequest::new("u-hr").with_reason("no coverage"),
        );
        assert_eq!(entry.remarks.as_deref(), Some("no coverage"));
        assert_eq!(entry.created_at, at);
        assert_eq!(entry.entity_id, "LV-1");
    }
}
