use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{owned_project, project_ids};
use crate::database::changes_of;
use crate::database::models::{Milestone, MilestoneStatus, Priority, Task};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{nullable, require_text, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMilestone {
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    pub client_visible: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateMilestone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MilestoneStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_visible: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MilestoneDetail {
    #[serde(flatten)]
    pub milestone: Milestone,
    pub tasks: Vec<Task>,
}

async fn owned_milestone(state: &AppState, user_id: Uuid, id: Uuid) -> Result<Milestone, ApiError> {
    let milestone = state
        .repo::<Milestone>()
        .select_one(Filter::by_id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Milestone not found"))?;
    owned_project(state, user_id, milestone.project_id)
        .await
        .map_err(|_| ApiError::not_found("Milestone not found"))?;
    Ok(milestone)
}

/// POST /milestone
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateMilestone>,
) -> ApiResult<Milestone> {
    require_text("title", &input.title)?;
    owned_project(&state, user.id, input.project_id).await?;

    let now = Utc::now();
    let milestone = Milestone {
        id: Uuid::new_v4(),
        project_id: input.project_id,
        title: input.title.trim().to_string(),
        description: input.description,
        status: input.status,
        priority: input.priority,
        start_date: input.start_date,
        due_date: input.due_date,
        completed_date: (input.status == MilestoneStatus::Completed).then_some(now),
        progress: 0,
        tasks_count: 0,
        completed_tasks: 0,
        deliverables: input.deliverables,
        client_visible: input.client_visible.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    Ok(ApiResponse::created(state.repo::<Milestone>().create(&milestone).await?))
}

/// GET /milestone - Milestones across the user's projects, by due date
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Milestone>> {
    let ids = project_ids(&state, user.id).await?;
    if ids.is_empty() {
        return Ok(ApiResponse::success(vec![]));
    }
    let milestones = state
        .repo::<Milestone>()
        .select_any(Filter::new().is_in("project_id", ids).order_asc("due_date"))
        .await?;
    Ok(ApiResponse::success(milestones))
}

/// GET /milestone/p/:project_id
pub async fn list_by_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(project_id): PathId,
) -> ApiResult<Vec<Milestone>> {
    owned_project(&state, user.id, project_id).await?;
    let milestones = state
        .repo::<Milestone>()
        .select_any(Filter::new().eq("project_id", project_id).order_asc("due_date"))
        .await?;
    Ok(ApiResponse::success(milestones))
}

/// GET /milestone/:id - Milestone with its tasks
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<MilestoneDetail> {
    let milestone = owned_milestone(&state, user.id, id).await?;
    let tasks = state
        .repo::<Task>()
        .select_any(Filter::new().eq("milestone_id", id).order_asc("created_at"))
        .await?;
    Ok(ApiResponse::success(MilestoneDetail { milestone, tasks }))
}

/// PUT /milestone/:id - Partial update; `completed` stamps `completed_date`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateMilestone>,
) -> ApiResult<Milestone> {
    if let Some(title) = &input.title {
        require_text("title", title)?;
    }
    let current = owned_milestone(&state, user.id, id).await?;

    let mut changes = changes_of(&input)?;
    match input.status {
        Some(MilestoneStatus::Completed) if current.status != MilestoneStatus::Completed => {
            changes.insert("completed_date".into(), json!(Utc::now()));
        }
        Some(status) if status != MilestoneStatus::Completed && current.completed_date.is_some() => {
            changes.insert("completed_date".into(), Value::Null);
        }
        _ => {}
    }

    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    Ok(ApiResponse::success(
        state.repo::<Milestone>().update_one(Filter::by_id(id), changes).await?,
    ))
}

/// DELETE /milestone/:id - Soft delete; tasks keep their milestone_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    owned_milestone(&state, user.id, id).await?;
    state.repo::<Milestone>().delete(Filter::by_id(id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
