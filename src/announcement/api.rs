//! Announcement endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::Announcement;
use crate::auth::AuthUser;
use crate::community::api::user_ref;
use crate::community::is_community_admin;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::notification::{self, NotificationKind};
use crate::state::AppState;

pub(crate) fn announcement_view(db: &Database, announcement: &Announcement) -> serde_json::Value {
    let mut value = serde_json::to_value(announcement).unwrap_or_else(|_| json!({}));
    value["author"] = user_ref(db, &announcement.author);
    value["community"] = match db.communities.get(&announcement.community) {
        Some(c) => json!({ "id": c.id, "name": c.name }),
        None => json!({ "id": announcement.community }),
    };
    value
}

fn is_admin_for_announcement(db: &Database, announcement: &Announcement, user: &crate::users::User) -> bool {
    db.communities
        .get(&announcement.community)
        .map(|c| is_community_admin(user, &c))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Used by POST /api/announcements; the community-scoped route takes the
    /// ID from the path instead.
    #[serde(default)]
    pub community_id: Option<String>,
}

async fn create_in_community(
    state: AppState,
    user: crate::users::User,
    community_id: String,
    request: CreateAnnouncementRequest,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if request.title.trim().is_empty() || request.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "Please provide title and content".to_string(),
        ));
    }

    let community = state
        .db
        .communities
        .get(&community_id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !community.is_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You must be a member to create announcements".to_string(),
        ));
    }
    if community.is_banned_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You are restricted from creating announcements".to_string(),
        ));
    }

    let announcement = Announcement::new(
        request.title.trim().to_string(),
        request.content,
        user.id.clone(),
        community.id.clone(),
    );
    state
        .db
        .announcements
        .insert(&announcement.id.clone(), announcement.clone());

    notification::notify_community_members(
        &state.db,
        &community,
        &user,
        NotificationKind::Announcement,
        format!("New announcement in {}: {}", community.name, announcement.title),
        &announcement.id,
    );

    Ok((
        StatusCode::CREATED,
        Json(announcement_view(&state.db, &announcement)),
    ))
}

/// POST /api/communities/:id/announcements
pub async fn create_announcement_in_community(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<impl IntoResponse> {
    create_in_community(state, user, id, request).await
}

/// POST /api/announcements (communityId in the body)
pub async fn create_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<impl IntoResponse> {
    let community_id = request.community_id.clone().ok_or_else(|| {
        ApiError::Validation(
            "Community is required. Use POST /api/communities/:id/announcements or send communityId in the body.".to_string(),
        )
    })?;
    create_in_community(state, user, community_id, request).await
}

/// GET /api/communities/:id/announcements — pinned first, then newest.
pub async fn get_announcements(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut announcements = state.db.announcements.find(|a| a.community == id);
    announcements.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.created_at.cmp(&a.created_at))
    });

    Json(
        announcements
            .iter()
            .map(|a| announcement_view(&state.db, a))
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// PUT /api/announcements/:id — author only.
pub async fn update_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let announcement = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;

    if announcement.author != user.id {
        return Err(ApiError::Forbidden(
            "You can only edit your own announcements".to_string(),
        ));
    }

    state.db.announcements.update(&id, |a| {
        if let Some(title) = &request.title {
            if !title.trim().is_empty() {
                a.title = title.trim().to_string();
            }
        }
        if let Some(content) = &request.content {
            if !content.is_empty() {
                a.content = content.clone();
            }
        }
        a.updated_at = Utc::now();
    });

    let updated = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;
    Ok(Json(announcement_view(&state.db, &updated)))
}

/// POST /api/announcements/:id/pin — community admins only.
///
/// Clears the pinned flag on every other announcement in the community
/// first — at most one pinned announcement per community.
pub async fn pin_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let announcement = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;

    if !is_admin_for_announcement(&state.db, &announcement, &user) {
        return Err(ApiError::Forbidden(
            "Only community admins can pin announcements".to_string(),
        ));
    }

    let now = Utc::now();
    state.db.announcements.update_all(|a| {
        if a.community == announcement.community {
            if a.id == announcement.id {
                a.is_pinned = true;
                a.pinned_at = Some(now);
            } else {
                a.is_pinned = false;
                a.pinned_at = None;
            }
        }
    });

    let updated = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;
    Ok(Json(announcement_view(&state.db, &updated)))
}

/// POST /api/announcements/:id/unpin — community admins only.
pub async fn unpin_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let announcement = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;

    if !is_admin_for_announcement(&state.db, &announcement, &user) {
        return Err(ApiError::Forbidden(
            "Only community admins can unpin announcements".to_string(),
        ));
    }

    state.db.announcements.update(&id, |a| {
        a.is_pinned = false;
        a.pinned_at = None;
    });

    let updated = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;
    Ok(Json(announcement_view(&state.db, &updated)))
}

/// DELETE /api/announcements/:id — author or community admin.
pub async fn delete_announcement(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let announcement = state
        .db
        .announcements
        .get(&id)
        .ok_or(ApiError::NotFound("Announcement"))?;

    let is_author = announcement.author == user.id;
    if !is_author && !is_admin_for_announcement(&state.db, &announcement, &user) {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this announcement".to_string(),
        ));
    }

    state.db.announcements.remove(&announcement.id);

    Ok(Json(json!({ "message": "Announcement deleted successfully" })))
}
