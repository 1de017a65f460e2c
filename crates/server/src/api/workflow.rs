use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use erpflow_core::audit::{AuditEntry, AuditQuery};
use erpflow_core::workflow::states::{EntityKind, TransitionRequest, WorkflowAction};
use erpflow_db::repositories::{AuditLogRepository, SqlAuditLogRepository};
use erpflow_db::AppliedTransition;

use super::{bad_request, failure, ApiResult, ApiState};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub actor_id: String,
    pub reason: Option<String>,
    pub remarks: Option<String>,
    pub expected_version: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub action: WorkflowAction,
    pub from: String,
    pub to: String,
    pub version: i64,
    pub deleted: bool,
    pub audit_id: Option<String>,
}

impl From<AppliedTransition> for ActionResponse {
    fn from(applied: AppliedTransition) -> Self {
        Self {
            entity_kind: applied.outcome.kind,
            entity_id: applied.outcome.entity_id,
            action: applied.outcome.action,
            from: applied.outcome.from.as_str().to_string(),
            to: applied.outcome.to.as_str().to_string(),
            version: applied.snapshot.version,
            deleted: applied.snapshot.lifecycle.is_deleted(),
            audit_id: applied.audit.map(|entry| entry.id),
        }
    }
}

pub(crate) async fn apply_for_kind(
    kind: EntityKind,
    State(state): State<ApiState>,
    id: String,
    action: String,
    Json(body): Json<ActionBody>,
) -> ApiResult<ActionResponse> {
    let action = action
        .parse::<WorkflowAction>()
        .map_err(|error| bad_request(error.to_string()))?;

    let mut request = TransitionRequest::new(body.actor_id);
    request.reason = body.reason;
    request.remarks = body.remarks;

    state
        .workflow
        .apply(kind, &id, action, request, body.expected_version)
        .await
        .map(|applied| Json(applied.into()))
        .map_err(failure)
}

/// Catch-all for `/api/{resource}/{id}/{action}` on resources that have no
/// workflow.
pub async fn apply_action(
    state: State<ApiState>,
    Path((resource, id, action)): Path<(String, String, String)>,
    body: Json<ActionBody>,
) -> ApiResult<ActionResponse> {
    let kind = EntityKind::from_resource(&resource)
        .ok_or_else(|| bad_request(format!("unknown workflow resource `{resource}`")))?;
    apply_for_kind(kind, state, id, action, body).await
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuditLogParams {
    pub entity_kind: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
}

pub async fn list_audit_logs(
    State(state): State<ApiState>,
    Query(params): Query<AuditLogParams>,
) -> ApiResult<Vec<AuditEntry>> {
    let entity_kind = params
        .entity_kind
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(str::parse::<EntityKind>)
        .transpose()
        .map_err(|error| bad_request(error.to_string()))?;

    let query = AuditQuery {
        entity_kind,
        entity_id: params.entity_id.filter(|value| !value.trim().is_empty()),
        actor_id: params.actor_id.filter(|value| !value.trim().is_empty()),
    };
    SqlAuditLogRepository::new(state.db_pool.clone())
        .query(&query)
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}
