use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_onboarding_token, OnboardingClaims};
use crate::database::models::Associate;
use crate::filter::Filter;
use crate::handlers::{require_email, require_text, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAssociate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedAssociate {
    pub associate: Associate,
    /// Link token the associate uses to set a password
    pub onboarding_token: String,
}

/**
 * POST /associate - Register a freelancer and issue their onboarding link
 *
 * Expected Input:
 * ```json
 * { "name": "Jane Doe", "email": "jane@example.com", "phone": "+254...", "skills": ["design"] }
 * ```
 *
 * The associate starts as `invited` and becomes `onboarded` once they follow
 * the link at `/associate/onboarding/:token`.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateAssociate>,
) -> ApiResult<CreatedAssociate> {
    require_text("name", &input.name)?;
    require_email("email", &input.email)?;

    let associate = Associate::new(user.id, input.name.trim().to_string(), &input.email, input.phone, input.skills);
    let associate = state.repo::<Associate>().create(&associate).await?;
    let onboarding_token = generate_onboarding_token(&OnboardingClaims::new(associate.id, associate.name.clone()))?;

    tracing::info!("User {} added associate {}", user.id, associate.id);
    Ok(ApiResponse::created(CreatedAssociate {
        associate,
        onboarding_token,
    }))
}

/// GET /associate - List the user's associates by name
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Associate>> {
    let associates = state
        .repo::<Associate>()
        .select_any(Filter::new().eq("user_id", user.id).order_asc("name"))
        .await?;
    Ok(ApiResponse::success(associates))
}

/// GET /associate/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Associate> {
    let associate = state
        .repo::<Associate>()
        .select_404(Filter::by_id(id).eq("user_id", user.id))
        .await?;
    Ok(ApiResponse::success(associate))
}

/// DELETE /associate/:id - Soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let associates = state.repo::<Associate>();
    let filter = Filter::by_id(id).eq("user_id", user.id);
    associates.select_404(filter.clone()).await?;
    associates.delete(filter).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
