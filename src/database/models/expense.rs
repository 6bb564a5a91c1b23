use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    ExpenseCategory {
        Software => "software",
        Hardware => "hardware",
        Outsourcing => "outsourcing",
        Other => "other",
    } default Other
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub vendor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Expense {
    const TABLE: &'static str = "expenses";
    const NAME: &'static str = "Expense";
}
