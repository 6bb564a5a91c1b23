use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::auth::Role;
use crate::database::models::Associate;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::state::AppState;

/// The associate behind an associate-role session token
#[derive(Clone, Debug)]
pub struct CurrentAssociate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

pub async fn validate_associate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before associate validation"))?;

    if auth_user.role != Role::Associate {
        tracing::warn!("Associate validation failed: token for {} has role {:?}", auth_user.id, auth_user.role);
        return Err(ApiError::forbidden("Associate access required"));
    }

    let associate = state
        .repo::<Associate>()
        .select_one(Filter::by_id(auth_user.id))
        .await?
        .ok_or_else(|| {
            tracing::warn!("Associate validation failed: associate {} not found", auth_user.id);
            ApiError::forbidden("Associate account is not active")
        })?;

    tracing::debug!("Associate validation successful: {} ({})", associate.name, associate.id);

    request.extensions_mut().insert(CurrentAssociate {
        id: associate.id,
        user_id: associate.user_id,
        name: associate.name,
        email: associate.email,
    });
    Ok(next.run(request).await)
}
