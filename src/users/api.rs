//! Profile and account-lifecycle endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{User, UserView};
use crate::auth::api::{is_valid_email_format, MIN_PASSWORD_LEN};
use crate::auth::{hash_password, verify_password, AuthUser};
use crate::db::cascade;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < USERNAME_MIN {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if username.len() > USERNAME_MAX {
        return Err(ApiError::Validation(
            "Username cannot exceed 30 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub hometown: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserView>> {
    let mut updated = user.clone();

    if let Some(name) = &request.name {
        if !name.trim().is_empty() {
            updated.name = name.trim().to_string();
        }
    }

    if let Some(username) = &request.username {
        let trimmed = username.trim();
        if !trimmed.is_empty() {
            validate_username(trimmed)?;
            let normalized = trimmed.to_lowercase();
            if normalized != user.username
                && state
                    .db
                    .users
                    .find_one(|u| u.username == normalized)
                    .is_some()
            {
                return Err(ApiError::Validation("Username already exists".to_string()));
            }
            updated.username = normalized;
        }
    }

    if let Some(email) = &request.email {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ApiError::Validation(
                "Email is required and cannot be empty".to_string(),
            ));
        }
        if !is_valid_email_format(&normalized) {
            return Err(ApiError::Validation("Invalid email format".to_string()));
        }
        if normalized != user.email
            && state.db.users.find_one(|u| u.email == normalized).is_some()
        {
            return Err(ApiError::Validation("Email already exists".to_string()));
        }
        updated.email = normalized;
    }

    // Location fields are required — updates may change but never clear them.
    if let Some(hometown) = &request.hometown {
        if !hometown.trim().is_empty() {
            updated.hometown = hometown.trim().to_string();
        }
    }
    if let Some(city) = &request.city {
        if !city.trim().is_empty() {
            updated.city = city.trim().to_string();
        }
    }
    if let Some(st) = &request.state {
        if !st.trim().is_empty() {
            updated.state = st.trim().to_string();
        }
    }

    if updated.hometown.is_empty() {
        return Err(ApiError::Validation("Hometown is required".to_string()));
    }
    if updated.city.is_empty() {
        return Err(ApiError::Validation("City is required".to_string()));
    }
    if updated.state.is_empty() {
        return Err(ApiError::Validation("State is required".to_string()));
    }

    updated.updated_at = Utc::now();
    let view = UserView::from(&updated);
    state.db.users.update(&user.id, move |u| *u = updated);

    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// PUT /api/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.current_password.is_empty() || request.new_password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide current password and new password".to_string(),
        ));
    }

    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "New password must be at least 8 characters long".to_string(),
        ));
    }

    if !verify_password(&request.current_password, &user.password_hash) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(&request.new_password)?;
    state.db.users.update(&user.id, |u| {
        u.password_hash = new_hash;
        u.updated_at = Utc::now();
    });

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<UserView>> {
    let user: User = state.db.users.get(&id).ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserView::from(&user)))
}

/// GET /api/users/:id/posts
pub async fn get_user_posts(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut posts = state.db.posts.find(|p| p.author == id);
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        posts
            .iter()
            .map(|p| crate::post::api::post_view(&state.db, p, None))
            .collect(),
    )
}

/// GET /api/users/:id/communities — communities the user created.
pub async fn get_user_communities(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut communities = state.db.communities.find(|c| c.creator == id);
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let items = communities
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "description": c.description,
                "city": c.city,
                "state": c.state,
                "status": c.status,
                "memberCount": c.member_count,
                "createdAt": c.created_at,
                "creator": crate::community::api::user_ref(&state.db, &c.creator),
            })
        })
        .collect();

    Json(items)
}

/// DELETE /api/users/me — full account deletion with cascade.
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    if !cascade::delete_user_account(&state.db, &user.id) {
        return Err(ApiError::NotFound("User"));
    }

    Ok(Json(json!({
        "message": "Account deleted successfully. All your data has been permanently removed.",
    })))
}
