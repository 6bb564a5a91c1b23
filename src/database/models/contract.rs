use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub project_id: Uuid,
    pub task_id: Uuid,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub effort: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timeline_notes: String,
    #[serde(default)]
    pub payment_terms: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Contract {
    const TABLE: &'static str = "contracts";
    const NAME: &'static str = "Contract";
}
