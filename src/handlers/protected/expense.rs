use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owned_project;
use crate::config;
use crate::database::changes_of;
use crate::database::models::{Expense, ExpenseCategory};
use crate::filter::Filter;
use crate::handlers::{require_non_negative, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateExpense {
    pub project_id: Uuid,
    pub amount: Decimal,
    pub currency: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vendor: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateExpense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

fn owned(user: &CurrentUser, id: Uuid) -> Filter {
    Filter::by_id(id).eq("user_id", user.id)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateExpense>,
) -> ApiResult<Expense> {
    require_non_negative("amount", input.amount)?;
    let project = owned_project(&state, user.id, input.project_id).await?;

    let now = Utc::now();
    let expense = Expense {
        id: Uuid::new_v4(),
        user_id: user.id,
        project_id: project.id,
        amount: input.amount,
        currency: input
            .currency
            .unwrap_or_else(|| config::config().finance.default_currency.clone()),
        description: input.description,
        category: input.category,
        date: input.date.unwrap_or(now),
        vendor: input.vendor,
        created_at: now,
        updated_at: now,
    };
    Ok(ApiResponse::created(state.repo::<Expense>().create(&expense).await?))
}

pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Expense>> {
    let expenses = state
        .repo::<Expense>()
        .select_any(Filter::new().eq("user_id", user.id).order_desc("date"))
        .await?;
    Ok(ApiResponse::success(expenses))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Expense> {
    Ok(ApiResponse::success(state.repo::<Expense>().select_404(owned(&user, id)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateExpense>,
) -> ApiResult<Expense> {
    if let Some(amount) = input.amount {
        require_non_negative("amount", amount)?;
    }
    let expenses = state.repo::<Expense>();
    let changes = changes_of(&input)?;
    if changes.is_empty() {
        return Ok(ApiResponse::success(expenses.select_404(owned(&user, id)).await?));
    }
    Ok(ApiResponse::success(expenses.update_one(owned(&user, id), changes).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let expenses = state.repo::<Expense>();
    expenses.select_404(owned(&user, id)).await?;
    expenses.delete(owned(&user, id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
