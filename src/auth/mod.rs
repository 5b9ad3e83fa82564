//! Bearer-token auth: token issue/verify, password hashing, and the request
//! gates every authenticated route goes through.
//!
//! Authorization is stateless — the only account-level state consulted per
//! request is the suspension/ban flags on the freshly loaded user record.

pub mod api;

use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::{PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::User;

/// Bearer tokens are valid for 30 days.
const TOKEN_TTL_DAYS: i64 = 30;

/// JWT claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing/verification keys derived from the configured secret.
#[derive(Clone)]
pub struct AuthTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthTokens {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed, time-limited token for a user.
    pub fn issue(&self, user_id: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".to_string()))
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Constant-time verification against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    password_hash::PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extractor for authenticated routes.
///
/// Verifies the bearer token, loads the current user, and rejects banned or
/// suspended accounts with the restriction reason echoed to the caller.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

        let claims = state.tokens.verify(token)?;

        let user = state
            .db
            .users
            .get(&claims.sub)
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        if user.is_banned {
            return Err(ApiError::AccountRestricted {
                message: "Your account has been banned".to_string(),
                reason: user.ban_reason.clone(),
            });
        }

        if user.is_suspended {
            return Err(ApiError::AccountRestricted {
                message: "Your account has been suspended".to_string(),
                reason: user.suspension_reason.clone(),
            });
        }

        Ok(AuthUser(user))
    }
}

/// Extractor for platform-admin routes — [`AuthUser`] plus the role check.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(ApiError::Forbidden("Not authorized as admin".to_string()))
        }
    }
}
