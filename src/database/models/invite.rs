use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

text_enum! {
    InviteStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
    } default Pending
}

/// An offer to an associate to take on one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub task_id: Uuid,
    pub associate_id: Uuid,
    pub contract_id: Option<Uuid>,
    #[serde(default)]
    pub status: InviteStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Invite {
    const TABLE: &'static str = "invites";
    const NAME: &'static str = "Invite";
}

impl Invite {
    pub fn new(project_id: Uuid, task_id: Uuid, associate_id: Uuid, contract_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            task_id,
            associate_id,
            contract_id,
            status: InviteStatus::Pending,
            responded_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
