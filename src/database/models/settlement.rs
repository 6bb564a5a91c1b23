use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    SettlementStatus {
        Pending => "pending",
        PartiallySettled => "partially_settled",
        Settled => "settled",
    } default Pending
}

/// Amount owed to one associate for one task.
///
/// At most one row exists per `(task_id, associate_id)`. `expected_amount` and
/// `settled_amount` are integer minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub project_id: Uuid,
    pub task_id: Uuid,
    pub associate_id: Uuid,
    pub user_id: Uuid,
    /// Associate's share of the task value at the time of the last upsert
    pub percentage_cut: Decimal,
    pub expected_amount: i64,
    #[serde(default)]
    pub settled_amount: i64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub transaction_ref: String,
    #[serde(default)]
    pub status: SettlementStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Settlement {
    const TABLE: &'static str = "settlements";
    const NAME: &'static str = "Settlement";
}
