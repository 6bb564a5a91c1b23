use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::normalize_email;
use super::Model;

/// A client company owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Entity {
    const TABLE: &'static str = "entities";
    const NAME: &'static str = "Entity";
}

impl Entity {
    pub fn new(user_id: Uuid, company_name: String, contact: String, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            company_name,
            contact,
            email: normalize_email(email),
            created_at: now,
            updated_at: now,
        }
    }
}
