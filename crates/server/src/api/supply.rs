use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use erpflow_core::domain::branch_distribution::{
    BranchDistributionDraft, BranchDistributionId, BranchDistributionRequest,
};
use erpflow_core::domain::scm_request::{ScmRequest, ScmRequestDraft, ScmRequestId};
use erpflow_core::errors::ApplicationError;
use erpflow_core::workflow::states::EntityKind;
use erpflow_db::repositories::{
    BranchDistributionRepository, ScmRequestRepository, SqlBranchDistributionRepository,
    SqlScmRequestRepository,
};

use super::{failure, new_id, ApiError, ApiResult, ApiState, ListQuery};

// ---------------------------------------------------------------------------
// SCM requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ScmRequestUpdate {
    #[serde(flatten)]
    pub draft: ScmRequestDraft,
    pub expected_version: Option<i64>,
}

async fn active_scm_request(state: &ApiState, id: &str) -> Result<ScmRequest, ApiError> {
    SqlScmRequestRepository::new(state.db_pool.clone())
        .find_by_id(&ScmRequestId(id.to_string()))
        .await
        .map_err(|error| failure(error.into()))?
        .filter(|request| request.lifecycle.is_active())
        .ok_or_else(|| failure(ApplicationError::not_found(EntityKind::ScmRequest.as_str(), id)))
}

pub async fn list_scm_requests(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ScmRequest>> {
    SqlScmRequestRepository::new(state.db_pool.clone())
        .list(&query.into())
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn create_scm_request(
    State(state): State<ApiState>,
    Json(draft): Json<ScmRequestDraft>,
) -> Result<(StatusCode, Json<ScmRequest>), ApiError> {
    let request = ScmRequest::create(ScmRequestId(new_id()), draft, Utc::now())
        .map_err(|error| failure(error.into()))?;
    SqlScmRequestRepository::new(state.db_pool.clone())
        .insert(&request)
        .await
        .map_err(|error| failure(error.into()))?;

    info!(
        event_name = "scm.request.created",
        scm_request_id = %request.id.0,
        request_no = %request.request_no,
        items = request.items.len(),
        total_amount = %request.total_amount,
        "scm request filed"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_scm_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<ScmRequest> {
    active_scm_request(&state, &id).await.map(Json)
}

pub async fn update_scm_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(update): Json<ScmRequestUpdate>,
) -> ApiResult<ScmRequest> {
    let mut request = active_scm_request(&state, &id).await?;
    let expected_version = update.expected_version.unwrap_or(request.version);
    request.revise(update.draft, Utc::now()).map_err(|error| failure(error.into()))?;
    SqlScmRequestRepository::new(state.db_pool.clone())
        .update(&request, expected_version)
        .await
        .map_err(|error| failure(error.into()))?;
    request.version = expected_version + 1;
    Ok(Json(request))
}

pub async fn delete_scm_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .workflow
        .soft_delete(EntityKind::ScmRequest, &id)
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Branch distribution requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DistributionUpdate {
    #[serde(flatten)]
    pub draft: BranchDistributionDraft,
    pub expected_version: Option<i64>,
}

async fn active_distribution(
    state: &ApiState,
    id: &str,
) -> Result<BranchDistributionRequest, ApiError> {
    SqlBranchDistributionRepository::new(state.db_pool.clone())
        .find_by_id(&BranchDistributionId(id.to_string()))
        .await
        .map_err(|error| failure(error.into()))?
        .filter(|request| request.lifecycle.is_active())
        .ok_or_else(|| {
            failure(ApplicationError::not_found(EntityKind::BranchDistribution.as_str(), id))
        })
}

pub async fn list_distributions(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<BranchDistributionRequest>> {
    SqlBranchDistributionRepository::new(state.db_pool.clone())
        .list(&query.into())
        .await
        .map(Json)
        .map_err(|error| failure(error.into()))
}

pub async fn create_distribution(
    State(state): State<ApiState>,
    Json(draft): Json<BranchDistributionDraft>,
) -> Result<(StatusCode, Json<BranchDistributionRequest>), ApiError> {
    let request = BranchDistributionRequest::create(BranchDistributionId(new_id()), draft, Utc::now())
        .map_err(|error| failure(error.into()))?;
    SqlBranchDistributionRepository::new(state.db_pool.clone())
        .insert(&request)
        .await
        .map_err(|error| failure(error.into()))?;

    info!(
        event_name = "scm.distribution.created",
        distribution_id = %request.id.0,
        branch_name = %request.branch_name,
        items = request.items.len(),
        "branch distribution requested"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_distribution(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<BranchDistributionRequest> {
    active_distribution(&state, &id).await.map(Json)
}

pub async fn update_distribution(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(update): Json<DistributionUpdate>,
) -> ApiResult<BranchDistributionRequest> {
    let mut request = active_distribution(&state, &id).await?;
    let expected_version = update.expected_version.unwrap_or(request.version);
    request.revise(update.draft, Utc::now()).map_err(|error| failure(error.into()))?;
    SqlBranchDistributionRepository::new(state.db_pool.clone())
        .update(&request, expected_version)
        .await
        .map_err(|error| failure(error.into()))?;
    request.version = expected_version + 1;

    info!(
        event_name = "scm.distribution.updated",
        distribution_id = %request.id.0,
        items = request.items.len(),
        version = request.version,
        "branch distribution revised"
    );
    Ok(Json(request))
}

pub async fn delete_distribution(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .workflow
        .soft_delete(EntityKind::BranchDistribution, &id)
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}
