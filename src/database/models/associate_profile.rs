use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Model;

/// Login credentials and public profile an associate fills in during onboarding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociateProfile {
    pub id: Uuid,
    pub associate_id: Uuid,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub profile_photo_url: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_onboarded: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_verification_level")]
    pub verification_level: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub portfolio_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub website_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_verification_level() -> String {
    "basic".to_string()
}

impl Model for AssociateProfile {
    const TABLE: &'static str = "associate_profiles";
    const NAME: &'static str = "Associate profile";
}

impl AssociateProfile {
    pub fn new(associate_id: Uuid, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            associate_id,
            password_hash,
            phone_number: None,
            profile_photo_url: None,
            bio: None,
            is_onboarded: false,
            is_verified: false,
            verification_level: default_verification_level(),
            verified_at: None,
            portfolio_url: None,
            linkedin_url: None,
            website_url: None,
            skills: vec![],
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
