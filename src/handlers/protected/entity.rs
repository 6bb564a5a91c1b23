use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};

use crate::database::changes_of;
use crate::database::models::{user::normalize_email, Entity};
use crate::filter::Filter;
use crate::handlers::{require_email, require_text, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEntity {
    #[serde(alias = "companyName")]
    pub company_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateEntity {
    #[serde(alias = "companyName", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn owned(user: &CurrentUser, id: uuid::Uuid) -> Filter {
    Filter::by_id(id).eq("user_id", user.id)
}

/// POST /entity - Create a client
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateEntity>,
) -> ApiResult<Entity> {
    require_text("company_name", &input.company_name)?;
    if !input.email.trim().is_empty() {
        require_email("email", &input.email)?;
    }

    let entity = Entity::new(user.id, input.company_name.trim().to_string(), input.contact, &input.email);
    Ok(ApiResponse::created(state.repo::<Entity>().create(&entity).await?))
}

/// GET /entity - List the user's clients, newest first
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Entity>> {
    let entities = state
        .repo::<Entity>()
        .select_any(Filter::new().eq("user_id", user.id).order_desc("created_at"))
        .await?;
    Ok(ApiResponse::success(entities))
}

/// GET /entity/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Entity> {
    Ok(ApiResponse::success(state.repo::<Entity>().select_404(owned(&user, id)).await?))
}

/// PUT /entity/:id - Partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(mut input): JsonBody<UpdateEntity>,
) -> ApiResult<Entity> {
    if let Some(name) = &input.company_name {
        require_text("company_name", name)?;
    }
    if let Some(email) = input.email.take() {
        if !email.trim().is_empty() {
            require_email("email", &email)?;
        }
        input.email = Some(normalize_email(&email));
    }

    let entities = state.repo::<Entity>();
    let changes = changes_of(&input)?;
    if changes.is_empty() {
        return Ok(ApiResponse::success(entities.select_404(owned(&user, id)).await?));
    }
    Ok(ApiResponse::success(entities.update_one(owned(&user, id), changes).await?))
}

/// DELETE /entity/:id - Soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let entities = state.repo::<Entity>();
    entities.select_404(owned(&user, id)).await?;
    entities.delete(owned(&user, id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
