use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::owned_project;
use crate::config;
use crate::database::changes_of;
use crate::database::models::{Invoice, InvoiceStatus};
use crate::filter::Filter;
use crate::handlers::{nullable, require_non_negative, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInvoice {
    pub project_id: Uuid,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateInvoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<Option<String>>,
}

fn owned(user: &CurrentUser, id: Uuid) -> Filter {
    Filter::by_id(id).eq("user_id", user.id)
}

/**
 * POST /invoice - Draft an invoice for a project
 *
 * Expected Input:
 * {
 *   "project_id": "uuid",
 *   "amount": 5000,          // optional, defaults to the project's actual_value
 *   "due_date": "2026-01-31T00:00:00Z"
 * }
 *
 * The invoice number is `<invoice_prefix>` plus the first eight hex digits of
 * the new id.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreateInvoice>,
) -> ApiResult<Invoice> {
    let project = owned_project(&state, user.id, input.project_id).await?;
    let amount = input.amount.unwrap_or(project.actual_value);
    require_non_negative("amount", amount)?;

    let finance = &config::config().finance;
    let id = Uuid::new_v4();
    let now = Utc::now();
    let invoice = Invoice {
        id,
        user_id: user.id,
        project_id: project.id,
        invoice_number: Invoice::number_for(id, &finance.invoice_prefix),
        amount,
        currency: input.currency.unwrap_or_else(|| project.currency.clone()),
        status: InvoiceStatus::Draft,
        issue_date: input.issue_date.unwrap_or(now),
        due_date: input.due_date,
        paid_date: None,
        description: input.description,
        notes: input.notes,
        payment_method: input.payment_method,
        transaction_ref: None,
        created_at: now,
        updated_at: now,
    };

    let invoice = state.repo::<Invoice>().create(&invoice).await?;
    tracing::info!("Invoice {} drafted for project {}", invoice.invoice_number, project.id);
    Ok(ApiResponse::created(invoice))
}

/// GET /invoice and GET /invoice/u - The user's invoices, newest first
pub async fn list(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Invoice>> {
    let invoices = state
        .repo::<Invoice>()
        .select_any(Filter::new().eq("user_id", user.id).order_desc("issue_date"))
        .await?;
    Ok(ApiResponse::success(invoices))
}

/// GET /invoice/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(state.repo::<Invoice>().select_404(owned(&user, id)).await?))
}

/// PUT /invoice/:id - Partial update; moving to `paid` stamps `paid_date`
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdateInvoice>,
) -> ApiResult<Invoice> {
    if let Some(amount) = input.amount {
        require_non_negative("amount", amount)?;
    }
    let invoices = state.repo::<Invoice>();
    let current = invoices.select_404(owned(&user, id)).await?;

    let mut changes = changes_of(&input)?;
    match input.status {
        Some(InvoiceStatus::Paid) if current.status != InvoiceStatus::Paid => {
            changes.insert("paid_date".into(), json!(Utc::now()));
        }
        Some(status) if status != InvoiceStatus::Paid && current.paid_date.is_some() => {
            changes.insert("paid_date".into(), Value::Null);
        }
        _ => {}
    }

    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    Ok(ApiResponse::success(invoices.update_one(owned(&user, id), changes).await?))
}

/// DELETE /invoice/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let invoices = state.repo::<Invoice>();
    invoices.select_404(owned(&user, id)).await?;
    invoices.delete(owned(&user, id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
