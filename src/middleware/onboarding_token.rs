use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_onboarding_token, OnboardingClaims};
use crate::database::models::Associate;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct OnboardingContext {
    pub claims: OnboardingClaims,
    pub associate: Associate,
}

/// Verifies the `:token` path segment as an onboarding token
pub async fn onboarding_token_middleware(
    State(state): State<AppState>,
    Path(token): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = validate_onboarding_token(&token).map_err(|e| {
        tracing::warn!("Rejected onboarding token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let associate = state
        .repo::<Associate>()
        .select_one(Filter::by_id(claims.associate_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Associate not found"))?;

    request.extensions_mut().insert(OnboardingContext { claims, associate });
    Ok(next.run(request).await)
}
