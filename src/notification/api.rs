//! Notification read endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use super::{Notification, NotificationKind};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/notifications — newest 50 plus the total unread count.
///
/// Announcement notifications written before `relatedCommunityId` existed
/// are backfilled here by looking the announcement up, so clients can always
/// deep-link into the right community.
pub async fn get_my_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<serde_json::Value> {
    let mut notifications = state.db.notifications.find(|n| n.user == user.id);
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications.truncate(50);

    let notifications: Vec<Notification> = notifications
        .into_iter()
        .map(|mut n| {
            if n.kind == NotificationKind::Announcement && n.related_community_id.is_none() {
                if let Some(related_id) = &n.related_id {
                    n.related_community_id = state
                        .db
                        .announcements
                        .get(related_id)
                        .map(|a| a.community);
                }
            }
            n
        })
        .collect();

    let unread_count = state
        .db
        .notifications
        .count(|n| n.user == user.id && !n.is_read);

    Json(json!({
        "notifications": notifications,
        "unreadCount": unread_count,
    }))
}

/// PATCH /api/notifications/:id/read — owner-scoped.
pub async fn mark_as_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let notification = state
        .db
        .notifications
        .get(&id)
        .filter(|n| n.user == user.id)
        .ok_or(ApiError::NotFound("Notification"))?;

    state.db.notifications.update(&notification.id, |n| {
        n.is_read = true;
    });

    let updated = state
        .db
        .notifications
        .get(&notification.id)
        .ok_or(ApiError::NotFound("Notification"))?;
    Ok(Json(updated))
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<serde_json::Value> {
    state.db.notifications.update_all(|n| {
        if n.user == user.id {
            n.is_read = true;
        }
    });

    Json(json!({ "message": "All notifications marked as read" }))
}
