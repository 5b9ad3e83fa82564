//! Direct-message endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use super::Message;
use crate::auth::AuthUser;
use crate::community::api::{user_name_ref, user_ref};
use crate::community::Community;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::post::api::{parse_upload_form, store_attachments};
use crate::state::AppState;

pub(crate) fn message_view(db: &Database, message: &Message) -> serde_json::Value {
    let mut value = serde_json::to_value(message).unwrap_or_else(|_| json!({}));
    value["sender"] = user_ref(db, &message.sender);
    value["receiver"] = user_ref(db, &message.receiver);
    value["community"] = match db.communities.get(&message.community) {
        Some(c) => json!({ "id": c.id, "name": c.name }),
        None => json!({ "id": message.community }),
    };

    if let Some(post_id) = &message.shared_post {
        if let Some(post) = db.posts.get(post_id) {
            value["sharedPost"] = json!({
                "id": post.id,
                "content": post.content,
                "files": post.files,
                "createdAt": post.created_at,
                "author": user_name_ref(db, &post.author),
                "community": db.communities.get(&post.community)
                    .map(|c| json!({ "id": c.id, "name": c.name }))
                    .unwrap_or_else(|| json!({ "id": post.community })),
            });
        }
    }

    value
}

fn is_participant(community: &Community, user_id: &str) -> bool {
    community.is_member(user_id) || community.creator == user_id
}

/// POST /api/messages (multipart: receiverId, communityId, content, postId,
/// files)
///
/// Both participants must belong to the community. An optional `postId`
/// shares a post into the conversation; the post must be from the same
/// community.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = parse_upload_form(multipart).await?;

    let receiver_id = form.fields.get("receiverId").cloned().unwrap_or_default();
    let community_id = form.fields.get("communityId").cloned().unwrap_or_default();
    let content = form.fields.get("content").cloned().unwrap_or_default();
    let post_id = form.fields.get("postId").cloned().filter(|p| !p.is_empty());

    if receiver_id.is_empty() {
        return Err(ApiError::Validation("Receiver is required".to_string()));
    }

    let community = state
        .db
        .communities
        .get(&community_id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !is_participant(&community, &user.id) || !is_participant(&community, &receiver_id) {
        return Err(ApiError::Forbidden(
            "Both users must be members of the community".to_string(),
        ));
    }

    let shared_post = match &post_id {
        Some(post_id) => {
            let post = state
                .db
                .posts
                .get(post_id)
                .ok_or(ApiError::NotFound("Post"))?;
            if post.community != community_id {
                return Err(ApiError::Validation(
                    "Post must be from the same community".to_string(),
                ));
            }
            Some(post.id)
        }
        None => None,
    };

    let files = store_attachments(&state, &form)?;

    let content = if content.is_empty() && shared_post.is_some() {
        "Shared a post".to_string()
    } else {
        content
    };

    let message = Message::new(
        user.id.clone(),
        receiver_id,
        community.id.clone(),
        content,
        files,
        shared_post,
    );
    state.db.messages.insert(&message.id.clone(), message.clone());

    Ok((
        StatusCode::CREATED,
        Json(message_view(&state.db, &message)),
    ))
}

/// GET /api/messages/community/:communityId/conversation/:receiverId
///
/// The thread between the caller and one partner, oldest first. Fetching it
/// marks the partner's unread messages as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((community_id, receiver_id)): Path<(String, String)>,
) -> Json<Vec<serde_json::Value>> {
    let mut messages = state.db.messages.find(|m| {
        m.community == community_id
            && ((m.sender == user.id && m.receiver == receiver_id)
                || (m.sender == receiver_id && m.receiver == user.id))
    });
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let now = Utc::now();
    state.db.messages.update_all(|m| {
        if m.sender == receiver_id
            && m.receiver == user.id
            && m.community == community_id
            && !m.is_read
        {
            m.is_read = true;
            m.read_at = Some(now);
        }
    });

    Json(
        messages
            .iter()
            .map(|m| message_view(&state.db, m))
            .collect(),
    )
}

/// GET /api/messages/community/:communityId/conversations
///
/// One entry per conversation partner with the latest message and unread
/// count, newest conversations first.
pub async fn get_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(community_id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut messages = state
        .db
        .messages
        .find(|m| m.community == community_id && (m.sender == user.id || m.receiver == user.id));
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    struct Conversation {
        partner: String,
        last_message: Message,
        unread_count: usize,
    }

    let mut by_partner: HashMap<String, Conversation> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for message in messages {
        let partner = if message.sender == user.id {
            message.receiver.clone()
        } else {
            message.sender.clone()
        };

        let entry = by_partner.entry(partner.clone()).or_insert_with(|| {
            order.push(partner.clone());
            Conversation {
                partner: partner.clone(),
                last_message: message.clone(),
                unread_count: 0,
            }
        });

        if message.receiver == user.id && !message.is_read {
            entry.unread_count += 1;
        }
    }

    // `order` already reflects newest-first since messages were sorted.
    let items = order
        .iter()
        .filter_map(|partner| by_partner.get(partner))
        .map(|conversation| {
            json!({
                "partner": user_ref(&state.db, &conversation.partner),
                "lastMessage": message_view(&state.db, &conversation.last_message),
                "unreadCount": conversation.unread_count,
            })
        })
        .collect();

    Json(items)
}

/// GET /api/messages/unread-count
pub async fn get_unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<serde_json::Value> {
    let unread_count = state
        .db
        .messages
        .count(|m| m.receiver == user.id && !m.is_read);

    Json(json!({ "unreadCount": unread_count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub community_id: String,
}

/// POST /api/messages/mark-read
pub async fn mark_as_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<MarkReadRequest>,
) -> Json<serde_json::Value> {
    let now = Utc::now();
    state.db.messages.update_all(|m| {
        if m.sender == request.sender_id
            && m.receiver == user.id
            && m.community == request.community_id
            && !m.is_read
        {
            m.is_read = true;
            m.read_at = Some(now);
        }
    });

    Json(json!({ "message": "Messages marked as read" }))
}

/// DELETE /api/messages/:id — sender only.
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let message = state
        .db
        .messages
        .get(&id)
        .ok_or(ApiError::NotFound("Message"))?;

    if message.sender != user.id {
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    state.db.messages.remove(&message.id);

    Ok(Json(json!({ "message": "Message deleted successfully" })))
}
