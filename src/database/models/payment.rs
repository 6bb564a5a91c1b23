use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    PaymentStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Failed => "failed",
    } default Pending
}

/// Money received from a client against an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub transaction_ref: String,
    pub paid_date: DateTime<Utc>,
    #[serde(default)]
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Payment {
    const TABLE: &'static str = "payments";
    const NAME: &'static str = "Payment";
}
