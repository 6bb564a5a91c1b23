use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::auth::{generate_jwt, hash_password, Claims, Role};
use crate::database::models::{Associate, AssociateProfile, AssociateStatus};
use crate::database::{changes_of, DatabaseError, Repository};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::require_password;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, OnboardingContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub associate: Associate,
    pub token: String,
}

/// POST /associate/onboarding/:token - Set a password and complete the associate's profile
pub async fn complete(
    State(state): State<AppState>,
    Extension(ctx): Extension<OnboardingContext>,
    JsonBody(input): JsonBody<OnboardingRequest>,
) -> ApiResult<OnboardingResponse> {
    require_password("password", &input.password)?;
    let associate = ctx.associate;

    let mut profile = AssociateProfile::new(associate.id, hash_password(&input.password)?);
    profile.is_onboarded = true;
    profile.phone_number = input.profile.phone_number.clone();
    profile.bio = input.profile.bio.clone();
    profile.profile_photo_url = input.profile.profile_photo_url.clone();
    profile.portfolio_url = input.profile.portfolio_url.clone();
    profile.linkedin_url = input.profile.linkedin_url.clone();
    profile.website_url = input.profile.website_url.clone();
    profile.skills = input.profile.skills.clone().unwrap_or_else(|| associate.skills.clone());

    let profiles = state.repo::<AssociateProfile>();
    let existing = profiles.select_one(Filter::new().eq("associate_id", associate.id)).await?;
    let mut ops = Vec::with_capacity(2);
    match existing {
        // Following the link again resets the password and merges new profile fields
        Some(current) => {
            let mut changes = changes_of(&input.profile)?;
            changes.insert("password_hash".into(), json!(profile.password_hash));
            changes.insert("is_onboarded".into(), json!(true));
            ops.push(Repository::<AssociateProfile>::update_op(Filter::by_id(current.id), changes));
        }
        None => ops.push(Repository::<AssociateProfile>::insert_op(&profile)?),
    }

    let mut associate_changes = Map::new();
    associate_changes.insert("status".into(), json!(AssociateStatus::Onboarded));
    ops.push(Repository::<Associate>::update_op(Filter::by_id(associate.id), associate_changes));

    let results = state.store.atomically(ops).await.map_err(|e| match e {
        DatabaseError::Conflict(_) => ApiError::conflict("Associate is already onboarded"),
        other => other.into(),
    })?;
    let associate = results
        .into_iter()
        .last()
        .map(Repository::<Associate>::decode_all)
        .transpose()?
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| ApiError::not_found("Associate not found"))?;

    let token = generate_jwt(&Claims::new(associate.id, Role::Associate))?;
    tracing::info!("Associate {} onboarded", associate.id);
    Ok(ApiResponse::success(OnboardingResponse { associate, token }))
}
