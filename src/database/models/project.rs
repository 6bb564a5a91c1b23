use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    ProjectStatus {
        Inquiry => "inquiry",
        Proposal => "proposal",
        Active => "active",
        Review => "review",
        Completed => "completed",
        Paid => "paid",
        Cancelled => "cancelled",
    } default Inquiry
}

text_enum! {
    ProjectPhase {
        Discovery => "discovery",
        Design => "design",
        Development => "development",
        Review => "review",
        Delivery => "delivery",
        Payment => "payment",
    } default Discovery
}

text_enum! {
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    } default Medium
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entity_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub current_phase: ProjectPhase,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_value: Decimal,
    #[serde(default)]
    pub actual_value: Decimal,
    pub currency: String,
    #[serde(default)]
    pub is_outsourced: bool,
    /// Share of each task's value the owner keeps, 0 to 100
    #[serde(default)]
    pub your_cut_percent: Decimal,
    #[serde(default)]
    pub progress_percent: i32,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Project {
    const TABLE: &'static str = "projects";
    const NAME: &'static str = "Project";
}
