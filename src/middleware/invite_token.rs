use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_invite_token, InviteClaims};
use crate::database::models::Invite;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::state::AppState;

/// A verified invite link and the invite it points at
#[derive(Clone, Debug)]
pub struct InviteContext {
    pub claims: InviteClaims,
    pub invite: Invite,
}

/// Verifies the `:token` path segment as an invite token
pub async fn invite_token_middleware(
    State(state): State<AppState>,
    Path(token): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = validate_invite_token(&token).map_err(|e| {
        tracing::warn!("Rejected invite token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let invite = state
        .repo::<Invite>()
        .select_one(Filter::by_id(claims.invite_id).eq("associate_id", claims.associate_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Invite not found"))?;

    request.extensions_mut().insert(InviteContext { claims, invite });
    Ok(next.run(request).await)
}
