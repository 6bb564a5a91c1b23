// handlers/mod.rs - Public (token-less or link-token) and protected (session token) endpoints

pub mod protected;
pub mod public;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Body returned by every DELETE endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: Uuid) -> Self {
        Self { id, deleted: true }
    }
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
///
/// Pair with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::field(field, "is required"));
    }
    Ok(())
}

pub(crate) fn require_email(field: &str, value: &str) -> Result<(), ApiError> {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::field(field, "must be a valid email address")),
    }
}

pub(crate) fn require_password(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() < 8 {
        return Err(ApiError::field(field, "must be at least 8 characters"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: Decimal) -> Result<(), ApiError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ApiError::field(field, "must not be negative"));
    }
    Ok(())
}

pub(crate) fn require_percent(field: &str, value: Decimal) -> Result<(), ApiError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ApiError::field(field, "must be between 0 and 100"));
    }
    Ok(())
}
