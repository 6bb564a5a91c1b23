use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult, InviteContext, JsonBody};
use crate::services::invite_service::InviteOutcome;
use crate::services::{InviteResponse, InviteService, InviteView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InviteResponseRequest {
    pub response: InviteResponse,
}

/// GET /associate/invite/:token - Invite details for the link's associate
pub async fn view(
    State(state): State<AppState>,
    Extension(ctx): Extension<InviteContext>,
) -> ApiResult<InviteView> {
    let view = InviteService::new(state.store.clone()).view(&ctx.invite).await?;
    Ok(ApiResponse::success(view))
}

/**
 * POST /associate/invite/response/:token - Accept or decline an invite
 *
 * Expected Input:
 * ```json
 * { "response": "accepted" }
 * ```
 *
 * Accepting assigns the task to the associate and creates (or refreshes) the
 * settlement owed for it. The invite update, the assignment and the
 * settlement are written together or not at all. Answering an invite that is
 * no longer pending answers 409.
 */
pub async fn respond(
    State(state): State<AppState>,
    Extension(ctx): Extension<InviteContext>,
    JsonBody(input): JsonBody<InviteResponseRequest>,
) -> ApiResult<InviteOutcome> {
    let outcome = InviteService::new(state.store.clone())
        .respond(&ctx.invite, input.response)
        .await?;
    Ok(ApiResponse::success(outcome))
}
