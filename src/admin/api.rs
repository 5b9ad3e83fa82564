//! Platform administration: stats, user moderation, community approval, and
//! the cascading community delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{hash_password, AdminUser};
use crate::community::CommunityStatus;
use crate::db::cascade;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::{Role, User, UserView};

/// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Json<serde_json::Value> {
    let week_ago = Utc::now() - Duration::days(7);

    Json(json!({
        "totalUsers": state.db.users.len(),
        "totalCommunities": state.db.communities.count(|c| c.status == CommunityStatus::Approved),
        "pendingCommunities": state.db.communities.count(|c| c.status == CommunityStatus::Pending),
        "totalPosts": state.db.posts.len(),
        "suspendedUsers": state.db.users.count(|u| u.is_suspended),
        "bannedUsers": state.db.users.count(|u| u.is_banned),
        "totalModerators": state.db.users.count(|u| u.role == Role::Moderator),
        "recentUsers": state.db.users.count(|u| u.created_at >= week_ago),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_suspended: Option<bool>,
    pub is_banned: Option<bool>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// GET /api/admin/users — filtered, paginated, newest first.
pub async fn get_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<UserFilter>,
) -> Json<serde_json::Value> {
    let search = filter.search.as_deref().map(str::to_lowercase);

    let mut users = state.db.users.find(|u| {
        search.as_deref().map_or(true, |needle| {
            u.name.to_lowercase().contains(needle) || u.email.to_lowercase().contains(needle)
        }) && filter.role.map_or(true, |role| u.role == role)
            && (filter.is_suspended != Some(true) || u.is_suspended)
            && (filter.is_banned != Some(true) || u.is_banned)
    });
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = users.len();
    let page = filter.page.unwrap_or(1).max(1);
    let limit = filter.limit.unwrap_or(20).max(1);
    let start = (page - 1) * limit;
    let items: Vec<UserView> = users
        .iter()
        .skip(start)
        .take(limit)
        .map(UserView::from)
        .collect();

    Json(json!({
        "users": items,
        "total": total,
        "page": page,
        "totalPages": total.div_ceil(limit),
    }))
}

// ── Community approval ───────────────────────────────────────────────────────

/// GET /api/admin/communities/pending
pub async fn get_pending_communities(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Json<Vec<serde_json::Value>> {
    let mut communities = state
        .db
        .communities
        .find(|c| c.status == CommunityStatus::Pending);
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        communities
            .iter()
            .map(|c| {
                let mut value = serde_json::to_value(c).unwrap_or_else(|_| json!({}));
                value["creator"] = crate::community::api::user_ref(&state.db, &c.creator);
                value
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct CommunityAdminFilter {
    pub status: Option<CommunityStatus>,
    pub search: Option<String>,
}

/// GET /api/admin/communities/all
pub async fn get_all_communities(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<CommunityAdminFilter>,
) -> Json<Vec<serde_json::Value>> {
    let search = filter.search.as_deref().map(str::to_lowercase);

    let mut communities = state.db.communities.find(|c| {
        filter.status.map_or(true, |status| c.status == status)
            && search.as_deref().map_or(true, |needle| {
                c.name.to_lowercase().contains(needle)
                    || c.description.to_lowercase().contains(needle)
            })
    });
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        communities
            .iter()
            .map(|c| {
                let mut value = serde_json::to_value(c).unwrap_or_else(|_| json!({}));
                value["creator"] = crate::community::api::user_ref(&state.db, &c.creator);
                value
            })
            .collect(),
    )
}

/// PUT /api/admin/communities/:id/approve
pub async fn approve_community(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db
        .communities
        .update(&id, |c| {
            c.status = CommunityStatus::Approved;
            c.touch();
        })
        .ok_or(ApiError::NotFound("Community"))?;

    Ok(Json(json!({ "message": "Community approved successfully" })))
}

/// PUT /api/admin/communities/:id/reject
pub async fn reject_community(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db
        .communities
        .update(&id, |c| {
            c.status = CommunityStatus::Rejected;
            c.touch();
        })
        .ok_or(ApiError::NotFound("Community"))?;

    Ok(Json(json!({ "message": "Community rejected successfully" })))
}

/// DELETE /api/admin/communities/:id — cascading delete.
pub async fn delete_community(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if !cascade::delete_community(&state.db, &id) {
        return Err(ApiError::NotFound("Community"));
    }

    Ok(Json(json!({
        "message": "Community deleted successfully. All associated data has been removed.",
    })))
}

// ── Admin accounts ───────────────────────────────────────────────────────────

/// GET /api/admin/admins
pub async fn get_admins(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Json<Vec<serde_json::Value>> {
    let mut admins = state.db.users.find(|u| u.role == Role::Admin);
    admins.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        admins
            .iter()
            .map(|u| {
                json!({
                    "id": u.id,
                    "name": u.name,
                    "email": u.email,
                    "createdAt": u.created_at,
                })
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub hometown: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// POST /api/admin/admins
///
/// Promotes an existing user, or creates a new admin account with a
/// generated temporary password returned once in the response.
pub async fn create_admin(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(request): Json<CreateAdminRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.email.trim().is_empty() || request.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "Email and name are required".to_string(),
        ));
    }

    let email = request.email.trim().to_lowercase();

    if let Some(existing) = state.db.users.find_one(|u| u.email == email) {
        if existing.role == Role::Admin {
            return Err(ApiError::Validation(
                "User is already an admin".to_string(),
            ));
        }

        state.db.users.update(&existing.id, |u| {
            u.role = Role::Admin;
            u.updated_at = Utc::now();
        });

        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": "User updated to admin successfully",
                "user": {
                    "id": existing.id,
                    "name": existing.name,
                    "email": existing.email,
                    "role": Role::Admin,
                },
            })),
        ));
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect::<String>()
        + "A1!";

    let now = Utc::now();
    let admin = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name.trim().to_string(),
        username: email.clone(),
        email,
        password_hash: hash_password(&password)?,
        hometown: request.hometown.unwrap_or_else(|| "Admin".to_string()),
        city: request.city.unwrap_or_else(|| "Admin".to_string()),
        state: request.state.unwrap_or_else(|| "Admin".to_string()),
        role: Role::Admin,
        is_suspended: false,
        suspension_reason: None,
        is_banned: false,
        ban_reason: None,
        reset_password_token: None,
        reset_password_expires: None,
        created_at: now,
        updated_at: now,
    };
    state.db.users.insert(&admin.id.clone(), admin.clone());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Admin user created successfully",
            "user": {
                "id": admin.id,
                "name": admin.name,
                "email": admin.email,
                "role": admin.role,
            },
            "temporaryPassword": password,
            "note": "Share this temporary password securely. User should change it after first login.",
        })),
    ))
}

// ── User moderation ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ModerationReason {
    pub reason: Option<String>,
}

/// PUT /api/admin/users/:id/suspend
pub async fn suspend_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<ModerationReason>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = state.db.users.get(&id).ok_or(ApiError::NotFound("User"))?;
    if user.role == Role::Admin {
        return Err(ApiError::Validation(
            "Cannot suspend admin users".to_string(),
        ));
    }

    state.db.users.update(&id, |u| {
        u.is_suspended = true;
        u.suspension_reason = Some(
            request
                .reason
                .clone()
                .unwrap_or_else(|| "Suspended by platform admin".to_string()),
        );
        u.updated_at = Utc::now();
    });

    Ok(Json(json!({ "message": "User suspended successfully" })))
}

/// PUT /api/admin/users/:id/unsuspend
pub async fn unsuspend_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db
        .users
        .update(&id, |u| {
            u.is_suspended = false;
            u.suspension_reason = None;
            u.updated_at = Utc::now();
        })
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(json!({ "message": "User unsuspended successfully" })))
}

/// PUT /api/admin/users/:id/ban
pub async fn ban_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(request): Json<ModerationReason>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = state.db.users.get(&id).ok_or(ApiError::NotFound("User"))?;
    if user.role == Role::Admin {
        return Err(ApiError::Validation("Cannot ban admin users".to_string()));
    }

    state.db.users.update(&id, |u| {
        u.is_banned = true;
        u.ban_reason = Some(
            request
                .reason
                .clone()
                .unwrap_or_else(|| "Banned by platform admin".to_string()),
        );
        u.updated_at = Utc::now();
    });

    Ok(Json(json!({ "message": "User banned successfully" })))
}

/// PUT /api/admin/users/:id/unban
pub async fn unban_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db
        .users
        .update(&id, |u| {
            u.is_banned = false;
            u.ban_reason = None;
            u.updated_at = Utc::now();
        })
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(json!({ "message": "User unbanned successfully" })))
}

// ── Moderators ───────────────────────────────────────────────────────────────

/// POST /api/admin/communities/:communityId/moderators/:userId
pub async fn assign_moderator(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path((community_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.db.users.contains(&user_id) {
        return Err(ApiError::NotFound("User"));
    }

    state
        .db
        .communities
        .update(&community_id, |c| {
            if !c.moderators.iter().any(|m| m == &user_id) {
                c.moderators.push(user_id.clone());
                c.touch();
            }
        })
        .ok_or(ApiError::NotFound("Community"))?;

    Ok(Json(json!({ "message": "Moderator assigned successfully" })))
}

/// DELETE /api/admin/communities/:communityId/moderators/:userId
pub async fn revoke_moderator(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path((community_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .db
        .communities
        .update(&community_id, |c| {
            c.moderators.retain(|m| m != &user_id);
            c.touch();
        })
        .ok_or(ApiError::NotFound("Community"))?;

    Ok(Json(json!({ "message": "Moderator role revoked successfully" })))
}
