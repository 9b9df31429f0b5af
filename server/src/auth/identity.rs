//! Buyer identity.
//!
//! Tokens have the form `<user uuid>.<hex HMAC-SHA256(secret, user uuid)>`.
//! Whoever holds the secret can mint tokens; the API only verifies them.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::utils::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let tag = self.mac(user_id)?.finalize().into_bytes();
        Ok(format!("{user_id}.{}", hex::encode(tag)))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let (user_part, tag_part) = token
            .split_once('.')
            .ok_or_else(|| AppError::Unauthorized("Malformed bearer token".to_string()))?;
        let user_id = Uuid::try_parse(user_part)
            .ok()
            .filter(|user_id| user_id.hyphenated().to_string() == user_part)
            .ok_or_else(|| AppError::Unauthorized("Malformed bearer token".to_string()))?;
        let tag = hex::decode(tag_part)
            .map_err(|_| AppError::Unauthorized("Malformed bearer token".to_string()))?;

        self.mac(user_id)?
            .verify_slice(&tag)
            .map_err(|_| AppError::Unauthorized("Invalid bearer token".to_string()))?;
        Ok(user_id)
    }

    fn mac(&self, user_id: Uuid) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::internal("Auth secret cannot key HMAC-SHA256"))?;
        mac.update(user_id.to_string().as_bytes());
        Ok(mac)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| {
            AppError::Unauthorized("Expected 'Bearer <token>' authorization".to_string())
        })?;
    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token".to_string()));
    }
    Ok(token)
}

/// The buyer a request acts for.
///
/// Placed in the request extensions by the identity guard; handlers extract
/// it like any other parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
