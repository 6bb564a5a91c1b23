use axum::{extract::State, Extension};

use crate::config;
use crate::database::models::Settlement;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::services::settlement_service::{AssociatePayables, MonthlySettled};
use crate::services::{PaymentUpdate, SettlementService};
use crate::state::AppState;

/// GET /settlements/recent - Open settlements grouped associate → project → task
pub async fn recent(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<AssociatePayables>> {
    let payables = SettlementService::new(state.store.clone()).recent(user.id).await?;
    Ok(ApiResponse::success(payables))
}

/// GET /settlements/history - Settled totals per month, newest first
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<MonthlySettled>> {
    let months = config::config().finance.history_months;
    let history = SettlementService::new(state.store.clone())
        .history(user.id, months)
        .await?;
    Ok(ApiResponse::success(history))
}

/**
 * PUT /settlements/:id/payment - Record a payout to the associate
 *
 * Expected Input:
 * {
 *   "settled_amount": 700,        // new cumulative total, minor units
 *   "transaction_ref": "MPESA-QX12",
 *   "method": "mpesa"             // optional
 * }
 */
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<PaymentUpdate>,
) -> ApiResult<Settlement> {
    let settlement = SettlementService::new(state.store.clone())
        .record_payment(id, user.id, input)
        .await?;
    Ok(ApiResponse::success(settlement))
}
