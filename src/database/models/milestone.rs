use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::Priority;
use super::Model;

text_enum! {
    MilestoneStatus {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        Delayed => "delayed",
    } default NotStarted
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    /// Recomputed from the milestone's tasks after every task write
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub tasks_count: i64,
    #[serde(default)]
    pub completed_tasks: i64,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default = "default_client_visible")]
    pub client_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_client_visible() -> bool {
    true
}

impl Model for Milestone {
    const TABLE: &'static str = "milestones";
    const NAME: &'static str = "Milestone";
}
