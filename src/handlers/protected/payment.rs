use std::collections::HashMap;

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use uuid::Uuid;

use crate::config;
use crate::database::changes_of;
use crate::database::models::{Invoice, InvoiceStatus, Payment, PaymentStatus};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{require_non_negative, Deleted};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, JsonBody, PathId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePayment {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub currency: Option<String>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub transaction_ref: String,
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: PaymentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdatePayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentListItem {
    #[serde(flatten)]
    pub payment: Payment,
    pub invoice_number: Option<String>,
}

fn owned(user: &CurrentUser, id: Uuid) -> Filter {
    Filter::by_id(id).eq("user_id", user.id)
}

/// Mark the invoice paid once its confirmed payments cover the amount
async fn settle_invoice(state: &AppState, invoice: &Invoice, paid_date: DateTime<Utc>) -> Result<(), ApiError> {
    if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Ok(());
    }

    let confirmed = state
        .repo::<Payment>()
        .select_any(
            Filter::new()
                .eq("invoice_id", invoice.id)
                .eq("status", PaymentStatus::Confirmed),
        )
        .await?
        .iter()
        .try_fold(Decimal::ZERO, |total, p| total.checked_add(p.amount))
        .ok_or_else(|| ApiError::bad_request("Confirmed payments exceed the supported amount range"))?;
    if confirmed < invoice.amount {
        return Ok(());
    }

    let mut changes = Map::new();
    changes.insert("status".into(), json!(InvoiceStatus::Paid));
    changes.insert("paid_date".into(), json!(paid_date));
    state.repo::<Invoice>().update(Filter::by_id(invoice.id), changes).await?;
    tracing::info!("Invoice {} paid in full", invoice.invoice_number);
    Ok(())
}

/// POST /payment - Record money received against one of the user's invoices
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(input): JsonBody<CreatePayment>,
) -> ApiResult<Payment> {
    require_non_negative("amount", input.amount)?;
    let invoice = state
        .repo::<Invoice>()
        .select_one(Filter::by_id(input.invoice_id).eq("user_id", user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice not found"))?;

    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        user_id: user.id,
        invoice_id: invoice.id,
        amount: input.amount,
        currency: input
            .currency
            .unwrap_or_else(|| config::config().finance.default_currency.clone()),
        method: input.method,
        transaction_ref: input.transaction_ref,
        paid_date: input.paid_date.unwrap_or(now),
        status: input.status,
        notes: input.notes,
        created_at: now,
        updated_at: now,
    };

    let payment = state.repo::<Payment>().create(&payment).await?;
    if payment.status == PaymentStatus::Confirmed {
        settle_invoice(&state, &invoice, payment.paid_date).await?;
    }
    Ok(ApiResponse::created(payment))
}

/// GET /payment - The user's payments with their invoice numbers
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<PaymentListItem>> {
    let payments = state
        .repo::<Payment>()
        .select_any(Filter::new().eq("user_id", user.id).order_desc("paid_date"))
        .await?;

    let mut invoice_ids: Vec<Uuid> = payments.iter().map(|p| p.invoice_id).collect();
    invoice_ids.sort();
    invoice_ids.dedup();
    let numbers: HashMap<Uuid, String> = state
        .repo::<Invoice>()
        .select_ids(invoice_ids)
        .await?
        .into_iter()
        .map(|i| (i.id, i.invoice_number))
        .collect();

    let items = payments
        .into_iter()
        .map(|payment| PaymentListItem {
            invoice_number: numbers.get(&payment.invoice_id).cloned(),
            payment,
        })
        .collect();
    Ok(ApiResponse::success(items))
}

/// GET /payment/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Payment> {
    Ok(ApiResponse::success(state.repo::<Payment>().select_404(owned(&user, id)).await?))
}

/// PUT /payment/:id - Confirming a payment may settle its invoice
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<UpdatePayment>,
) -> ApiResult<Payment> {
    if let Some(amount) = input.amount {
        require_non_negative("amount", amount)?;
    }
    let payments = state.repo::<Payment>();
    let current = payments.select_404(owned(&user, id)).await?;

    let changes = changes_of(&input)?;
    if changes.is_empty() {
        return Ok(ApiResponse::success(current));
    }
    let payment = payments.update_one(owned(&user, id), changes).await?;

    if payment.status == PaymentStatus::Confirmed {
        if let Some(invoice) = state
            .repo::<Invoice>()
            .select_one(Filter::by_id(payment.invoice_id))
            .await?
        {
            settle_invoice(&state, &invoice, payment.paid_date).await?;
        }
    }
    Ok(ApiResponse::success(payment))
}

/// DELETE /payment/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    PathId(id): PathId,
) -> ApiResult<Deleted> {
    let payments = state.repo::<Payment>();
    payments.select_404(owned(&user, id)).await?;
    payments.delete(owned(&user, id)).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
