use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{owned_project, owned_task, project_ids};
use crate::database::changes_of;
use crate::database::models::{Associate, Invite, Milestone, Priority, Project, Task, TaskStatus};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{nullable, require_non_negative, require_text, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::services::settlement_service::{associate_percentage, expected_amount};
use crate::services::{InviteService, ProgressService, SettlementService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    pub task_value: Option<Decimal>,
    pub assigned_to_associate: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateTask {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub task_value: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub assigned_to_associate: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvite {
    pub associate_id: Uuid,
    pub contract_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InviteCreated {
    pub invite: Invite,
    pub token: String,
}

fn check_hours(field: &'static str, hours: f64) -> Result<(), ApiError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ApiError::field(field, "must not be negative"));
    }
    Ok(())
}

async fn check_milestone(state: &AppState, project_id: Uuid, milestone_id: Uuid) -> Result<(), ApiError> {
    state
        .repo::<Milestone>()
        .select_one(Filter::by_id(milestone_id).eq("project_id", project_id))
        .await?
        .ok_or_else(|| ApiError::field("milestone_id", "must belong to the task's project"))?;
    Ok(())
}

/// Reject values whose associate share cannot be stored, before anything is written
fn check_payable(project: &Project, value: Decimal) -> Result<(), ApiError> {
    expected_amount(value, associate_percentage(project.your_cut_percent))?;
    Ok(())
}

async fn check_associate(state: &AppState, user_id: Uuid, associate_id: Uuid) -> Result<(), ApiError> {
    state
        .repo::<Associate>()
        .select_one(Filter::by_id(associate_id).eq("user_id", user_id))
        .await?
        .ok_or_else(|| ApiError::field("assigned_to_associate", "is not one of your associates"))?;
    Ok(())
}

/// Derived state every task write refreshes: the settlement, then progress
async fn after_write(state: &AppState, task: &Task, milestones: &[Option<Uuid>]) -> Result<(), ApiError> {
    SettlementService::new(state.store.clone()).upsert_for_task(task).await?;
    ProgressService::new(state.store.clone())
        .after_task_write(task.project_id, milestones)
        .await?;
    Ok(())
}

/**
 * POST /task - Create a task in one of the user's projects
 *
 * Expected Input:
 * {
 *   "project_id": "uuid",
 *   "title": "Landing page",
 *   "milestone_id": "uuid",          // optional, must be in the same project
 *   "task_value": 1000,              // optional, >= 0
 *   "assigned_to_associate": "uuid"  // optional, must be the user's associate
 * }
 *
 * A task with both a value and an assignee gets its settlement upserted
 * before the response is sent.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateTask>,
) -> ApiResult<Task> {
    require_text("title", &input.title)?;
    if let Some(value) = input.task_value {
        require_non_negative("task_value", value)?;
    }
    check_hours("estimated_hours", input.estimated_hours)?;
    check_hours("actual_hours", input.actual_hours)?;

    let project = owned_project(&state, user.id, input.project_id).await?;
    if let Some(value) = input.task_value {
        check_payable(&project, value)?;
    }
    if let Some(milestone_id) = input.milestone_id {
        check_milestone(&state, input.project_id, milestone_id).await?;
    }
    if let Some(associate_id) = input.assigned_to_associate {
        check_associate(&state, user.id, associate_id).await?;
    }

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        project_id: input.project_id,
        milestone_id: input.milestone_id,
        title: input.title.trim().to_string(),
        description: input.description,
        status: input.status,
        priority: input.priority,
        due_date: input.due_date,
        completed_at: (input.status == TaskStatus::Done).then_some(now),
        estimated_hours: input.estimated_hours,
        actual_hours: input.actual_hours,
        task_value: input.task_value,
        assigned_to_associate: input.assigned_to_associate,
        created_at: now,
        updated_at: now,
    };

    let task = state.repo::<Task>().create(&task).await?;
    after_write(&state, &task, &[task.milestone_id]).await?;
    Ok(ApiResponse::created(task))
}

/// GET /task - Tasks across all of the user's projects
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Task>> {
    let ids = project_ids(&state, user.id).await?;
    if ids.is_empty() {
        return Ok(ApiResponse::success(vec![]));
    }
    let tasks = state
        .repo::<Task>()
        .select_any(Filter::new().is_in("project_id", ids).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(tasks))
}

/// GET /task/p/:project_id
pub async fn list_by_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(project_id): PathId,
) -> ApiResult<Vec<Task>> {
    owned_project(&state, user.id, project_id).await?;
    let tasks = state
        .repo::<Task>()
        .select_any(Filter::new().eq("project_id", project_id).order_asc("created_at"))
        .await?;
    Ok(ApiResponse::success(tasks))
}

/// GET /task/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Task> {
    let (task, _) = owned_task(&state, user.id, id).await?;
    Ok(ApiResponse::success(task))
}

/**
 * PUT /task/:id - Partial update
 *
 * `milestone_id`, `due_date`, `task_value` and `assigned_to_associate` accept
 * an explicit `null` to clear them. Moving into `done` stamps `completed_at`;
 * moving out of `done` clears it.
 *
 * The settlement for the resulting `(task, assignee)` pair is upserted and
 * progress is recomputed for the project and both the old and new milestone.
 */
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateTask>,
) -> ApiResult<Task> {
    if let Some(title) = &input.title {
        require_text("title", title)?;
    }
    if let Some(Some(value)) = input.task_value {
        require_non_negative("task_value", value)?;
    }
    if let Some(hours) = input.estimated_hours {
        check_hours("estimated_hours", hours)?;
    }
    if let Some(hours) = input.actual_hours {
        check_hours("actual_hours", hours)?;
    }

    let (current, project) = owned_task(&state, user.id, id).await?;
    if let Some(Some(value)) = input.task_value {
        check_payable(&project, value)?;
    }
    if let Some(Some(milestone_id)) = input.milestone_id {
        check_milestone(&state, project.id, milestone_id).await?;
    }
    if let Some(Some(associate_id)) = input.assigned_to_associate {
        check_associate(&state, user.id, associate_id).await?;
    }

    let mut changes = changes_of(&input)?;
    match input.status {
        Some(TaskStatus::Done) if current.status != TaskStatus::Done => {
            changes.insert("completed_at".into(), json!(Utc::now()));
        }
        Some(status) if status != TaskStatus::Done && current.status == TaskStatus::Done => {
            changes.insert("completed_at".into(), Value::Null);
        }
        _ => {}
    }

    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    let task = state.repo::<Task>().update_one(Filter::by_id(id), changes).await?;
    after_write(&state, &task, &[current.milestone_id, task.milestone_id]).await?;
    Ok(ApiResponse::success(task))
}

/// DELETE /task/:id - Soft delete, then refresh progress
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let (task, _) = owned_task(&state, user.id, id).await?;
    state.repo::<Task>().delete(Filter::by_id(id)).await?;
    ProgressService::new(state.store.clone())
        .after_task_write(task.project_id, &[task.milestone_id])
        .await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}

/// POST /task/:id/invite - Invite an associate onto the task
pub async fn invite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<CreateInvite>,
) -> ApiResult<InviteCreated> {
    let (invite, token) = InviteService::new(state.store.clone())
        .create(user.id, id, input.associate_id, input.contract_id)
        .await?;
    Ok(ApiResponse::created(InviteCreated { invite, token }))
}

/// Tasks assigned to one associate, newest first
pub(crate) async fn assigned_to(state: &AppState, associate_id: Uuid) -> Result<Vec<Task>, ApiError> {
    Ok(state
        .repo::<Task>()
        .select_any(
            Filter::new()
                .eq("assigned_to_associate", associate_id)
                .order_desc("created_at"),
        )
        .await?)
}
