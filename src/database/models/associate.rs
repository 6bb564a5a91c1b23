use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::normalize_email;
use super::Model;

text_enum! {
    AssociateStatus {
        Invited => "invited",
        Onboarded => "onboarded",
    } default Invited
}

/// A subcontracted freelancer working under a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Associate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub status: AssociateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Associate {
    const TABLE: &'static str = "associates";
    const NAME: &'static str = "Associate";
}

impl Associate {
    pub fn new(user_id: Uuid, name: String, email: &str, phone: String, skills: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            email: normalize_email(email),
            phone,
            skills,
            status: AssociateStatus::Invited,
            created_at: now,
            updated_at: now,
        }
    }
}
