use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    } default Draft
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub invoice_number: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub payment_method: String,
    pub transaction_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Invoice {
    const TABLE: &'static str = "invoices";
    const NAME: &'static str = "Invoice";
}

impl Invoice {
    /// `<prefix><first 8 hex digits of the id, uppercased>`
    pub fn number_for(id: Uuid, prefix: &str) -> String {
        let simple = id.simple().to_string();
        format!("{}{}", prefix, simple[..8].to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_uses_id_prefix() {
        let id = Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(Invoice::number_for(id, "INV-FF-"), "INV-FF-3F2A9C1E");
    }
}
