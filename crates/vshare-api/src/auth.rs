//! Session authentication: argon2 credential hashes and HS256 JWTs.
//!
//! Tokens carry the account id and kind and travel either in the `token`
//! cookie or as a Bearer header. Credential failures are reported with one
//! generic message regardless of cause.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use vshare_models::{AccountKind, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Hash a password for storage.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Verify a presented password against a stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (user or organization)
    pub sub: String,
    /// Account kind
    pub kind: AccountKind,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Signing/verification keys for session tokens.
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: std::time::Duration,
}

impl AuthKeys {
    pub fn new(secret: &str, token_ttl: std::time::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    /// Issue a signed, time-limited session token.
    pub fn issue(&self, account_id: &str, kind: AccountKind) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            kind,
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::invalid_token())
    }
}

/// Authenticated identity extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub id: String,
    pub kind: AccountKind,
}

impl AuthIdentity {
    pub fn user_id(&self) -> UserId {
        UserId::from(self.id.as_str())
    }
}

/// Pull the bearer token out of the cookie or Authorization header.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(cookies) = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        for pair in cookies.split(';') {
            let pair = pair.trim();
            if let Some(value) = pair.strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or_else(ApiError::authentication_required)?;
        let claims = state.auth.verify(&token)?;
        Ok(AuthIdentity {
            id: claims.sub,
            kind: claims.kind,
        })
    }
}

/// Load the full user record behind an identity. Organization accounts have
/// no user surface and are rejected here.
pub async fn current_user(state: &AppState, identity: &AuthIdentity) -> ApiResult<User> {
    match identity.kind {
        AccountKind::User => state
            .users
            .get(&identity.user_id())
            .await?
            .ok_or_else(ApiError::invalid_token),
        AccountKind::Organization => Err(ApiError::forbidden(
            "This endpoint is only available to user accounts",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_roundtrip() {
        let keys = AuthKeys::new("test-secret", Duration::from_secs(3600));
        let token = keys.issue("user-1", AccountKind::User).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, AccountKind::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let keys = AuthKeys::new("secret-a", Duration::from_secs(3600));
        let other = AuthKeys::new("secret-b", Duration::from_secs(3600));
        let token = keys.issue("user-1", AccountKind::User).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let keys = AuthKeys::new("secret", Duration::from_secs(3600));
        let token = keys.issue("user-1", AccountKind::User).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(keys.verify(&tampered).is_err());
    }
}
