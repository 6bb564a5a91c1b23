use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::auth::{generate_jwt, hash_password, verify_password, Claims, Role};
use crate::database::models::{user::normalize_email, Associate, AssociateProfile, User, UserView};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::handlers::{require_email, require_password, require_text};
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AssociateSessionResponse {
    pub associate: Associate,
    pub token: String,
}

/**
 * POST /user/signup - Register an account and receive a session token
 *
 * Expected Input:
 * ```json
 * { "firstname": "Ada", "lastname": "Lovelace", "email": "ada@example.com", "password": "min 8 chars" }
 * ```
 *
 * Expected Output (201):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "user": { "id": "uuid", "email": "ada@example.com", "firstname": "Ada", "lastname": "Lovelace" },
 *     "token": "eyJhbGciOiJIUzI1NiI..."
 *   }
 * }
 * ```
 *
 * A duplicate email answers 409.
 */
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignupRequest>,
) -> ApiResult<SessionResponse> {
    require_text("firstname", &input.firstname)?;
    require_text("lastname", &input.lastname)?;
    require_email("email", &input.email)?;
    require_password("password", &input.password)?;

    let users = state.repo::<User>();
    let email = normalize_email(&input.email);
    if users.select_one(Filter::new().eq("email", email.as_str())).await?.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let user = User::new(
        input.firstname.trim().to_string(),
        input.lastname.trim().to_string(),
        &email,
        hash_password(&input.password)?,
    );
    let user = users.create(&user).await.map_err(|e| match e {
        DatabaseError::Conflict(_) => ApiError::conflict("Email is already registered"),
        other => other.into(),
    })?;

    let token = generate_jwt(&Claims::new(user.id, Role::User))?;
    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::created(SessionResponse {
        user: user.view(),
        token,
    }))
}

/// POST /user/login - Exchange email and password for a session token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginRequest>,
) -> ApiResult<SessionResponse> {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .repo::<User>()
        .select_one(Filter::new().eq("email", normalize_email(&input.email)))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&input.password, &user.password_hash) {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let token = generate_jwt(&Claims::new(user.id, Role::User))?;
    Ok(ApiResponse::success(SessionResponse {
        user: user.view(),
        token,
    }))
}

/// POST /user/associate/login - Session token for an onboarded associate
pub async fn associate_login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginRequest>,
) -> ApiResult<AssociateSessionResponse> {
    let invalid = || ApiError::unauthorized("Invalid email or password");

    // Several users may work with the same freelancer; the onboarded record wins
    let candidates = state
        .repo::<Associate>()
        .select_any(Filter::new().eq("email", normalize_email(&input.email)).order_desc("created_at"))
        .await?;

    let profiles = state.repo::<AssociateProfile>();
    for associate in candidates {
        let Some(profile) = profiles
            .select_one(Filter::new().eq("associate_id", associate.id).eq("is_onboarded", true))
            .await?
        else {
            continue;
        };
        if !verify_password(&input.password, &profile.password_hash) {
            continue;
        }

        let mut changes = Map::new();
        changes.insert("last_login_at".into(), json!(Utc::now()));
        profiles.update(Filter::by_id(profile.id), changes).await?;

        let token = generate_jwt(&Claims::new(associate.id, Role::Associate))?;
        return Ok(ApiResponse::success(AssociateSessionResponse { associate, token }));
    }

    tracing::warn!("Failed associate login");
    Err(invalid())
}
