use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub const INVITE_PURPOSE: &str = "invite";
pub const ONBOARDING_PURPOSE: &str = "onboarding";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("token was issued for a different purpose")]
    WrongPurpose,

    #[error("token generation failed: {0}")]
    Encoding(String),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Who a session token was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Associate,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "associate" => Ok(Role::Associate),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: Uuid, role: Role) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub,
            role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
        }
    }
}

/// Claims of the link an associate follows to answer a task invite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteClaims {
    pub invite_id: Uuid,
    pub associate_id: Uuid,
    pub task_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub purpose: String,
    pub exp: i64,
}

impl InviteClaims {
    pub fn new(invite_id: Uuid, associate_id: Uuid, task_id: Uuid, contract_id: Option<Uuid>) -> Self {
        let hours = config::config().security.invite_expiry_hours;
        Self {
            invite_id,
            associate_id,
            task_id,
            contract_id,
            purpose: INVITE_PURPOSE.to_string(),
            exp: (Utc::now() + Duration::hours(hours as i64)).timestamp(),
        }
    }
}

/// Claims of the link a new associate follows to set a password
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingClaims {
    pub associate_id: Uuid,
    pub fullname: String,
    pub purpose: String,
    pub exp: i64,
}

impl OnboardingClaims {
    pub fn new(associate_id: Uuid, fullname: String) -> Self {
        let hours = config::config().security.onboarding_expiry_hours;
        Self {
            associate_id,
            fullname,
            purpose: ONBOARDING_PURPOSE.to_string(),
            exp: (Utc::now() + Duration::hours(hours as i64)).timestamp(),
        }
    }
}

fn secret() -> Result<&'static [u8], AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    Ok(secret.as_bytes())
}

fn encode_token<C: Serialize>(claims: &C) -> Result<String, AuthError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret()?))
        .map_err(|e| AuthError::Encoding(e.to_string()))
}

fn decode_token<C: DeserializeOwned>(token: &str) -> Result<C, AuthError> {
    let validation = Validation::default();
    decode::<C>(token, &DecodingKey::from_secret(secret()?), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AuthError::InvalidToken
        })
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    encode_token(claims)
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    decode_token(token)
}

pub fn generate_invite_token(claims: &InviteClaims) -> Result<String, AuthError> {
    encode_token(claims)
}

pub fn validate_invite_token(token: &str) -> Result<InviteClaims, AuthError> {
    let claims: InviteClaims = decode_token(token)?;
    if claims.purpose != INVITE_PURPOSE {
        return Err(AuthError::WrongPurpose);
    }
    Ok(claims)
}

pub fn generate_onboarding_token(claims: &OnboardingClaims) -> Result<String, AuthError> {
    encode_token(claims)
}

pub fn validate_onboarding_token(token: &str) -> Result<OnboardingClaims, AuthError> {
    let claims: OnboardingClaims = decode_token(token)?;
    if claims.purpose != ONBOARDING_PURPOSE {
        return Err(AuthError::WrongPurpose);
    }
    Ok(claims)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, config::config().security.bcrypt_cost)?)
}

/// A malformed stored hash counts as a mismatch
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_round_trip() {
        let id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(id, Role::Associate)).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Associate);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::User);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(validate_jwt(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn onboarding_token_cannot_answer_an_invite() {
        let token = generate_onboarding_token(&OnboardingClaims::new(Uuid::new_v4(), "Jane Doe".into())).unwrap();
        assert!(validate_invite_token(&token).is_err());
        assert_eq!(validate_onboarding_token(&token).unwrap().fullname, "Jane Doe");
    }

    #[test]
    fn invite_purpose_is_checked() {
        let mut claims = InviteClaims::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), None);
        claims.purpose = ONBOARDING_PURPOSE.to_string();
        let token = generate_invite_token(&claims).unwrap();
        assert!(matches!(validate_invite_token(&token), Err(AuthError::WrongPurpose)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-bcrypt-hash"));
    }

    #[test]
    fn role_parses_from_cli_text() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("admin".parse::<Role>().is_err());
    }
}
