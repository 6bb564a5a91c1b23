// handlers/protected - Endpoints behind a session token.
//
// User-role routes see only rows the calling user owns; rows owned by someone
// else answer 404 exactly like missing ones.

pub mod associate;
pub mod associate_portal;
pub mod contract;
pub mod entity;
pub mod expense;
pub mod invoice;
pub mod milestone;
pub mod payment;
pub mod project;
pub mod settlement;
pub mod stats;
pub mod task;

use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{Project, Task};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProtectedInfo {
    pub user_id: Uuid,
    pub message: String,
}

/// GET /protected - Echo the authenticated user
pub async fn whoami(Extension(user): Extension<CurrentUser>) -> ApiResult<ProtectedInfo> {
    Ok(ApiResponse::success(ProtectedInfo {
        user_id: user.id,
        message: format!("Authenticated as {}", user.email),
    }))
}

pub(crate) async fn owned_project(state: &AppState, user_id: Uuid, project_id: Uuid) -> Result<Project, ApiError> {
    state
        .repo::<Project>()
        .select_one(Filter::by_id(project_id).eq("user_id", user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

pub(crate) async fn owned_task(state: &AppState, user_id: Uuid, task_id: Uuid) -> Result<(Task, Project), ApiError> {
    let task = state
        .repo::<Task>()
        .select_one(Filter::by_id(task_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    let project = owned_project(state, user_id, task.project_id)
        .await
        .map_err(|_| ApiError::not_found("Task not found"))?;
    Ok((task, project))
}

/// Ids of every project the user owns
pub(crate) async fn project_ids(state: &AppState, user_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
    Ok(state
        .repo::<Project>()
        .select_any(Filter::new().eq("user_id", user_id))
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect())
}
