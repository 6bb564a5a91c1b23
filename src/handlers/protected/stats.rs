// handlers/protected/stats.rs - Dashboard aggregates, recomputed on every request

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::stats_service::{
    AssociateStats, CategoryCount, DashboardStats, FinanceStats, MonthlyRevenue, SettlementStats,
};
use crate::services::StatsService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardBody {
    pub dashboard_stats: DashboardStats,
}

#[derive(Debug, Serialize)]
pub struct RevenueBody {
    pub revenue_stats: Vec<MonthlyRevenue>,
}

#[derive(Debug, Serialize)]
pub struct ProjectStatsBody {
    pub project_stats: Vec<CategoryCount>,
}

/// GET /stats/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<DashboardBody> {
    let dashboard_stats = StatsService::new(state.store.clone()).dashboard(user.id).await?;
    Ok(ApiResponse::success(DashboardBody { dashboard_stats }))
}

/// GET /stats/dashboard/revenue - Last six months, oldest first
pub async fn revenue(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<RevenueBody> {
    let revenue_stats = StatsService::new(state.store.clone()).revenue(user.id).await?;
    Ok(ApiResponse::success(RevenueBody { revenue_stats }))
}

/// GET /stats/dashboard/projects - Project counts per category
pub async fn projects(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ProjectStatsBody> {
    let project_stats = StatsService::new(state.store.clone())
        .projects_by_category(user.id)
        .await?;
    Ok(ApiResponse::success(ProjectStatsBody { project_stats }))
}

/// GET /stats/settlements
pub async fn settlements(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<SettlementStats> {
    Ok(ApiResponse::success(
        StatsService::new(state.store.clone()).settlements(user.id).await?,
    ))
}

/// GET /stats/associates
pub async fn associates(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<AssociateStats> {
    Ok(ApiResponse::success(
        StatsService::new(state.store.clone()).associates(user.id).await?,
    ))
}

/// GET /stats/finances
pub async fn finances(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<FinanceStats> {
    Ok(ApiResponse::success(
        StatsService::new(state.store.clone()).finances(user.id).await?,
    ))
}
