// handlers/protected/associate_portal.rs - Routes for associates signed in with their own session

use axum::{extract::State, Extension};

use super::task::assigned_to;
use crate::database::models::{Settlement, Task};
use crate::middleware::{ApiResponse, ApiResult, CurrentAssociate};
use crate::services::SettlementService;
use crate::state::AppState;

/// GET /associate/tasks - Tasks assigned to the calling associate
pub async fn tasks(
    State(state): State<AppState>,
    Extension(associate): Extension<CurrentAssociate>,
) -> ApiResult<Vec<Task>> {
    Ok(ApiResponse::success(assigned_to(&state, associate.id).await?))
}

/// GET /associate/settlements - The calling associate's settlements, newest first
pub async fn settlements(
    State(state): State<AppState>,
    Extension(associate): Extension<CurrentAssociate>,
) -> ApiResult<Vec<Settlement>> {
    let settlements = SettlementService::new(state.store.clone())
        .for_associate(associate.id)
        .await?;
    Ok(ApiResponse::success(settlements))
}
