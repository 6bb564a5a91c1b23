use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::owned_project;
use crate::config;
use crate::database::changes_of;
use crate::database::models::{Entity, Priority, Project, ProjectPhase, ProjectStatus, Task};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{nullable, require_non_negative, require_percent, require_text, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub entity_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub current_phase: ProjectPhase,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_value: Decimal,
    #[serde(default)]
    pub actual_value: Decimal,
    pub currency: Option<String>,
    #[serde(default)]
    pub your_cut_percent: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateProject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<ProjectPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_cut_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
}

/// POST /project - Create a project for one of the user's clients
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateProject>,
) -> ApiResult<Project> {
    require_text("name", &input.name)?;
    require_percent("your_cut_percent", input.your_cut_percent)?;
    require_non_negative("estimated_value", input.estimated_value)?;
    require_non_negative("actual_value", input.actual_value)?;

    state
        .repo::<Entity>()
        .select_one(Filter::by_id(input.entity_id).eq("user_id", user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Entity not found"))?;

    let now = Utc::now();
    let start_date = match (input.start_date, input.status) {
        (None, ProjectStatus::Active) => Some(now),
        (start, _) => start,
    };
    let project = Project {
        id: Uuid::new_v4(),
        user_id: user.id,
        entity_id: input.entity_id,
        name: input.name.trim().to_string(),
        description: input.description,
        category: input.category.trim().to_string(),
        status: input.status,
        current_phase: input.current_phase,
        priority: input.priority,
        start_date,
        deadline: input.deadline,
        completed_at: (input.status == ProjectStatus::Completed).then_some(now),
        estimated_value: input.estimated_value,
        actual_value: input.actual_value,
        currency: input
            .currency
            .unwrap_or_else(|| config::config().finance.default_currency.clone()),
        is_outsourced: input.your_cut_percent > Decimal::ZERO,
        your_cut_percent: input.your_cut_percent,
        progress_percent: 0,
        notes: input.notes,
        created_at: now,
        updated_at: now,
    };

    Ok(ApiResponse::created(state.repo::<Project>().create(&project).await?))
}

/// GET /project and GET /project/u - The user's projects, newest first
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Project>> {
    let projects = state
        .repo::<Project>()
        .select_any(Filter::new().eq("user_id", user.id).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(projects))
}

/// GET /project/e/:id - Projects for one client
pub async fn list_by_entity(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(entity_id): PathId,
) -> ApiResult<Vec<Project>> {
    let projects = state
        .repo::<Project>()
        .select_any(
            Filter::new()
                .eq("user_id", user.id)
                .eq("entity_id", entity_id)
                .order_desc("created_at"),
        )
        .await?;
    Ok(ApiResponse::success(projects))
}

/// GET /project/:id - Project with its tasks
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<ProjectDetail> {
    let project = owned_project(&state, user.id, id).await?;
    let tasks = state
        .repo::<Task>()
        .select_any(Filter::new().eq("project_id", id).order_asc("created_at"))
        .await?;
    Ok(ApiResponse::success(ProjectDetail { project, tasks }))
}

/**
 * PUT /project/:id - Partial update
 *
 * Side effects:
 * - `your_cut_percent` also sets `is_outsourced` to `cut > 0`
 * - moving to `active` fills an empty `start_date`
 * - moving to `completed` stamps `completed_at`
 *
 * Changing the cut does not touch existing settlements; they are refreshed
 * the next time their task is saved.
 */
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateProject>,
) -> ApiResult<Project> {
    if let Some(name) = &input.name {
        require_text("name", name)?;
    }
    if let Some(cut) = input.your_cut_percent {
        require_percent("your_cut_percent", cut)?;
    }
    for (field, value) in [("estimated_value", input.estimated_value), ("actual_value", input.actual_value)] {
        if let Some(value) = value {
            require_non_negative(field, value)?;
        }
    }

    let current = owned_project(&state, user.id, id).await?;
    let mut changes = changes_of(&input)?;

    if let Some(cut) = input.your_cut_percent {
        changes.insert("is_outsourced".into(), json!(cut > Decimal::ZERO));
    }
    match input.status {
        Some(ProjectStatus::Active) if current.start_date.is_none() && !changes.contains_key("start_date") => {
            changes.insert("start_date".into(), json!(Utc::now()));
        }
        Some(ProjectStatus::Completed) if current.status != ProjectStatus::Completed => {
            changes.insert("completed_at".into(), json!(Utc::now()));
        }
        _ => {}
    }

    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    let project = state
        .repo::<Project>()
        .update_one(Filter::by_id(id).eq("user_id", user.id), changes)
        .await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /project/:id - Soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    owned_project(&state, user.id, id).await?;
    state
        .repo::<Project>()
        .delete(Filter::by_id(id).eq("user_id", user.id))
        .await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
