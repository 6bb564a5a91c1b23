use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{owned_project, owned_task, project_ids};
use crate::database::changes_of;
use crate::database::models::Contract;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{nullable, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateContract {
    pub task_id: Uuid,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub effort: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timeline_notes: String,
    #[serde(default)]
    pub payment_terms: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateContract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,
}

async fn owned_contract(state: &AppState, user_id: Uuid, id: Uuid) -> Result<Contract, ApiError> {
    let contract = state
        .repo::<Contract>()
        .select_one(Filter::by_id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Contract not found"))?;
    owned_project(state, user_id, contract.project_id)
        .await
        .map_err(|_| ApiError::not_found("Contract not found"))?;
    Ok(contract)
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ApiError::field("end_date", "must not be before start_date")),
        _ => Ok(()),
    }
}

/// POST /contract - Terms for a task; the project is taken from the task
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateContract>,
) -> ApiResult<Contract> {
    check_dates(input.start_date, input.end_date)?;
    let (task, _) = owned_task(&state, user.id, input.task_id).await?;

    let now = Utc::now();
    let contract = Contract {
        id: Uuid::new_v4(),
        project_id: task.project_id,
        task_id: task.id,
        role: input.role,
        responsibilities: input.responsibilities,
        deliverables: input.deliverables,
        effort: input.effort,
        start_date: input.start_date,
        end_date: input.end_date,
        timeline_notes: input.timeline_notes,
        payment_terms: input.payment_terms,
        created_at: now,
        updated_at: now,
    };
    Ok(ApiResponse::created(state.repo::<Contract>().create(&contract).await?))
}

/// GET /contract
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Contract>> {
    let ids = project_ids(&state, user.id).await?;
    if ids.is_empty() {
        return Ok(ApiResponse::success(vec![]));
    }
    let contracts = state
        .repo::<Contract>()
        .select_any(Filter::new().is_in("project_id", ids).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(contracts))
}

/// GET /contract/t/:task_id - The task's contract, or null
pub async fn for_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(task_id): PathId,
) -> ApiResult<Option<Contract>> {
    owned_task(&state, user.id, task_id).await?;
    let contract = state
        .repo::<Contract>()
        .select_one(Filter::new().eq("task_id", task_id).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(contract))
}

/// GET /contract/p/:project_id
pub async fn list_by_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(project_id): PathId,
) -> ApiResult<Vec<Contract>> {
    owned_project(&state, user.id, project_id).await?;
    let contracts = state
        .repo::<Contract>()
        .select_any(Filter::new().eq("project_id", project_id).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(contracts))
}

/// GET /contract/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Contract> {
    Ok(ApiResponse::success(owned_contract(&state, user.id, id).await?))
}

/// PUT /contract/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateContract>,
) -> ApiResult<Contract> {
    let current = owned_contract(&state, user.id, id).await?;
    let start = input.start_date.unwrap_or(current.start_date);
    let end = input.end_date.unwrap_or(current.end_date);
    check_dates(start, end)?;

    let changes = changes_of(&input)?;
    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    Ok(ApiResponse::success(
        state.repo::<Contract>().update_one(Filter::by_id(id), changes).await?,
    ))
}

/// DELETE /contract/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    owned_contract(&state, user.id, id).await?;
    state.repo::<Contract>().delete(Filter::by_id(id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
