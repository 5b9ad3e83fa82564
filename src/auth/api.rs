//! Identity endpoints: registration, login, and password reset.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::{Role, User, UserView};

/// Minimum password length for registration, change, and reset.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Reset tokens are valid for 1 hour.
const RESET_TOKEN_TTL_MINS: i64 = 60;

// ── Email validation ─────────────────────────────────────────────────────────

/// Syntactic email check: `local@domain.tld`, 8–254 chars, local part of at
/// least 2 chars from `[A-Za-z0-9._%+-]`, dotted domain with an alphabetic
/// TLD of at least 2 chars.
pub fn is_valid_email_format(email: &str) -> bool {
    let trimmed = email.trim();
    if trimmed.len() < 8 || trimmed.len() > 254 {
        return false;
    }

    let Some(at) = trimmed.find('@') else {
        return false;
    };
    if at == 0 || at == trimmed.len() - 1 {
        return false;
    }

    let (local, domain) = (&trimmed[..at], &trimmed[at + 1..]);

    if local.len() < 2
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }

    if domain.len() < 4 || !domain.contains('.') {
        return false;
    }
    if !domain
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return false;
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((_, tld)) => tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// Live MX-record lookup against fixed public resolvers (8.8.8.8, 8.8.4.4,
/// 1.1.1.1). Fails closed: any resolution failure counts as undeliverable.
pub async fn email_domain_accepts_mail(email: &str) -> bool {
    use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
    use hickory_resolver::TokioAsyncResolver;
    use std::net::{IpAddr, Ipv4Addr};

    let Some((_, domain)) = email.split_once('@') else {
        return false;
    };

    let nameservers = NameServerConfigGroup::from_ips_clear(
        &[
            IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
            IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4)),
            IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)),
        ],
        53,
        true,
    );
    let config = ResolverConfig::from_parts(None, vec![], nameservers);
    let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());

    match resolver.mx_lookup(domain).await {
        Ok(records) => records.iter().next().is_some(),
        Err(e) => {
            tracing::debug!(domain, error = %e, "MX lookup failed");
            false
        }
    }
}

// ── Register / Login ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub hometown: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

/// Auth response: identity summary plus the bearer token.
fn auth_response(user: &User, token: String) -> serde_json::Value {
    json!({
        "id": user.id,
        "name": user.name,
        "username": user.username,
        "email": user.email,
        "token": token,
        "user": UserView::from(user),
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = request.name.trim().to_string();
    let username = request.username.trim().to_lowercase();
    let email = request.email.trim().to_lowercase();
    let hometown = request.hometown.trim().to_string();
    let city = request.city.trim().to_string();
    let province = request.state.trim().to_string();

    if name.is_empty()
        || username.is_empty()
        || email.is_empty()
        || request.password.is_empty()
        || hometown.is_empty()
        || city.is_empty()
        || province.is_empty()
    {
        return Err(ApiError::Validation(
            "Please provide all required fields".to_string(),
        ));
    }

    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if !is_valid_email_format(&email) {
        return Err(ApiError::Validation(
            "Invalid email or email does not exist. Please use a real email address.".to_string(),
        ));
    }

    if !state.config.skip_mx_check && !email_domain_accepts_mail(&email).await {
        return Err(ApiError::Validation(
            "Invalid email or email does not exist. Please use a real email address.".to_string(),
        ));
    }

    if state.db.users.find_one(|u| u.username == username).is_some() {
        return Err(ApiError::Validation("Username already exists".to_string()));
    }
    if state.db.users.find_one(|u| u.email == email).is_some() {
        return Err(ApiError::Validation("Email already exists".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        username,
        email,
        password_hash: hash_password(&request.password)?,
        hometown,
        city,
        state: province,
        role: Role::User,
        is_suspended: false,
        suspension_reason: None,
        is_banned: false,
        ban_reason: None,
        reset_password_token: None,
        reset_password_expires: None,
        created_at: now,
        updated_at: now,
    };

    let token = state.tokens.issue(&user.id)?;
    state.db.users.insert(&user.id.clone(), user.clone());

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(auth_response(&user, token))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email_or_username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
///
/// The identifier may be an email or a username, case-insensitive. The
/// failure response does not distinguish unknown identifier from wrong
/// password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.email_or_username.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email/username and password".to_string(),
        ));
    }

    let identifier = request.email_or_username.trim().to_lowercase();
    let user = state
        .db
        .users
        .find_one(|u| u.email == identifier || u.username == identifier);

    match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => {
            let token = state.tokens.issue(&user.id)?;
            Ok(Json(auth_response(&user, token)))
        }
        _ => Err(ApiError::Unauthorized(
            "Invalid email/username or password".to_string(),
        )),
    }
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(UserView::from(&user))
}

// ── Password reset ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email_or_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Mask an email for display: keep the first 2 chars of the local part,
/// replace the rest (up to 4 chars) with asterisks.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if local.len() > 2 => {
            let stars = "*".repeat((local.len() - 2).min(4));
            format!("{}{}@{}", &local[..2], stars, domain)
        }
        _ => email.to_string(),
    }
}

fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// POST /api/auth/forgot-password
///
/// Two-step flow: an identifier-only request answers with the masked email
/// so the client can confirm; an email request stores a hashed one-time
/// token (1 hour expiry) and sends the reset link. In mock-mail mode the
/// link is returned directly for local use.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if let (Some(identifier), None) = (&request.email_or_username, &request.email) {
        let identifier = identifier.trim().to_lowercase();
        let user = state
            .db
            .users
            .find_one(|u| u.email == identifier || u.username == identifier)
            .ok_or(ApiError::NotFound("User"))?;

        return Ok(Json(json!({
            "message": "Please provide your registered email to reset password",
            "requiresEmail": true,
            "maskedEmail": mask_email(&user.email),
        })));
    }

    let email = request
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Please provide email".to_string()))?;

    let Some(user) = state.db.users.find_one(|u| u.email == email) else {
        // Don't reveal whether the account exists.
        return Ok(Json(json!({
            "message": "If an account with that email exists, a password reset link has been sent.",
        })));
    };

    let mut token_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut token_bytes);
    let reset_token = hex::encode(token_bytes);
    let hashed = hash_reset_token(&reset_token);

    state.db.users.update(&user.id, |u| {
        u.reset_password_token = Some(hashed.clone());
        u.reset_password_expires = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINS));
    });

    let reset_url = format!("{}/reset-password/{}", state.config.frontend_url, reset_token);

    if state.mailer.is_mock() {
        let _ = state
            .mailer
            .send_password_reset(&user.email, &user.name, &reset_url)
            .await;
        return Ok(Json(json!({
            "message": "Email is not configured on the server. Use the link below to reset your password (development only).",
            "developmentMode": true,
            "resetLink": reset_url,
        })));
    }

    match state
        .mailer
        .send_password_reset(&user.email, &user.name, &reset_url)
        .await
    {
        Ok(()) => Ok(Json(json!({
            "message": "Password reset email sent successfully. Please check your inbox.",
        }))),
        Err(e) => {
            // Clear the token again if delivery failed.
            state.db.users.update(&user.id, |u| {
                u.reset_password_token = None;
                u.reset_password_expires = None;
            });
            tracing::error!(error = %e, "Password reset email failed");
            Err(ApiError::Internal(
                "Failed to send email. Please try again later.".to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.token.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide token and new password".to_string(),
        ));
    }

    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    let hashed = hash_reset_token(&request.token);
    let now = Utc::now();

    let user = state.db.users.find_one(|u| {
        u.reset_password_token.as_deref() == Some(hashed.as_str())
            && u.reset_password_expires.is_some_and(|exp| exp > now)
    });

    let Some(user) = user else {
        return Err(ApiError::Validation(
            "Invalid or expired reset token".to_string(),
        ));
    };

    let new_hash = hash_password(&request.password)?;
    state.db.users.update(&user.id, |u| {
        u.password_hash = new_hash.clone();
        u.reset_password_token = None;
        u.reset_password_expires = None;
        u.updated_at = Utc::now();
    });

    Ok(Json(json!({
        "message": "Password reset successfully. You can now login with your new password.",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format_accepts_normal_addresses() {
        assert!(is_valid_email_format("ab@test.com"));
        assert!(is_valid_email_format("first.last+tag@mail.example.org"));
    }

    #[test]
    fn email_format_rejects_malformed_addresses() {
        assert!(!is_valid_email_format("a@b.c")); // too short
        assert!(!is_valid_email_format("no-at-sign.com"));
        assert!(!is_valid_email_format("x@nodot"));
        assert!(!is_valid_email_format("ab@-dash-start.com"));
        assert!(!is_valid_email_format("ab@test.c0m")); // numeric TLD
        assert!(!is_valid_email_format("a b@test.com")); // space in local
    }

    #[test]
    fn masked_email_keeps_prefix_and_domain() {
        assert_eq!(mask_email("alice@test.com"), "al***@test.com");
        assert_eq!(mask_email("abcdefghij@test.com"), "ab****@test.com");
        // Too short to mask meaningfully — returned as-is
        assert_eq!(mask_email("ab@test.com"), "ab@test.com");
    }

    #[test]
    fn reset_token_hash_is_stable_sha256() {
        let a = hash_reset_token("token");
        let b = hash_reset_token("token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_reset_token("other"));
    }
}
