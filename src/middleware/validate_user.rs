use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::auth::Role;
use crate::database::models::User;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::state::AppState;

/// The account behind a user-role session token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

/// Requires a user-role token whose account still exists; injects `CurrentUser`
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    if auth_user.role != Role::User {
        tracing::warn!("User validation failed: token for {} has role {:?}", auth_user.id, auth_user.role);
        return Err(ApiError::forbidden("User access required"));
    }

    let user = state
        .repo::<User>()
        .select_one(Filter::by_id(auth_user.id))
        .await?
        .ok_or_else(|| {
            tracing::warn!("User validation failed: user {} not found", auth_user.id);
            ApiError::forbidden("User account is not active")
        })?;

    tracing::debug!("User validation successful: {} ({})", user.email, user.id);

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        firstname: user.firstname,
        lastname: user.lastname,
    });
    Ok(next.run(request).await)
}
