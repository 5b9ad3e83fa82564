//! Post and comment endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{Comment, Post};
use crate::auth::AuthUser;
use crate::community::api::{user_name_ref, user_ref};
use crate::community::{is_community_admin, CommunityStatus};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::notification::{self, NotificationKind};
use crate::state::AppState;
use crate::upload::{FileAttachment, MAX_FILES_PER_ITEM};
use crate::users::User;

// ── View helpers ─────────────────────────────────────────────────────────────

pub(crate) fn comment_view(db: &Database, comment: &Comment) -> serde_json::Value {
    json!({
        "id": comment.id,
        "content": comment.content,
        "author": user_name_ref(db, &comment.author),
        "post": comment.post,
        "createdAt": comment.created_at,
    })
}

/// A post with author, community, and comments populated. `comment_limit`
/// truncates the embedded comments (used by the feed to bound payloads).
pub(crate) fn post_view(
    db: &Database,
    post: &Post,
    comment_limit: Option<usize>,
) -> serde_json::Value {
    let mut value = serde_json::to_value(post).unwrap_or_else(|_| json!({}));

    value["author"] = user_ref(db, &post.author);
    value["community"] = match db.communities.get(&post.community) {
        Some(c) => json!({ "id": c.id, "name": c.name }),
        None => json!({ "id": post.community }),
    };

    let limit = comment_limit.unwrap_or(usize::MAX);
    value["comments"] = post
        .comments
        .iter()
        .take(limit)
        .filter_map(|id| db.comments.get(id))
        .map(|c| comment_view(db, &c))
        .collect();
    value["likeCount"] = json!(post.likes.len());

    value
}

/// Whether the user may administer the community a post belongs to.
fn is_admin_for_post(db: &Database, post: &Post, user: &User) -> bool {
    db.communities
        .get(&post.community)
        .map(|c| is_community_admin(user, &c))
        .unwrap_or(false)
}

// ── Multipart parsing ────────────────────────────────────────────────────────

pub(crate) struct RawUpload {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Text fields plus raw file parts from a multipart body. Captions arrive as
/// `captions[0]`, `captions[1]`, ... keyed to the file order.
pub(crate) struct ParsedForm {
    pub fields: std::collections::HashMap<String, String>,
    pub files: Vec<RawUpload>,
    pub captions: std::collections::HashMap<usize, String>,
}

pub(crate) async fn parse_upload_form(mut multipart: Multipart) -> Result<ParsedForm, ApiError> {
    let mut form = ParsedForm {
        fields: std::collections::HashMap::new(),
        files: Vec::new(),
        captions: std::collections::HashMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "files" {
            if form.files.len() >= MAX_FILES_PER_ITEM {
                return Err(ApiError::Validation(format!(
                    "Too many files (max {MAX_FILES_PER_ITEM})"
                )));
            }
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Failed to read file data".to_string()))?
                .to_vec();
            form.files.push(RawUpload {
                original_name,
                content_type,
                data,
            });
        } else if let Some(index) = name
            .strip_prefix("captions[")
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|idx| idx.parse::<usize>().ok())
        {
            if let Ok(text) = field.text().await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    form.captions.insert(index, text);
                }
            }
        } else if let Ok(text) = field.text().await {
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

/// Store every raw upload, attaching captions by file index.
pub(crate) fn store_attachments(
    state: &AppState,
    form: &ParsedForm,
) -> Result<Vec<FileAttachment>, ApiError> {
    form.files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            state.uploads.store_file(
                &file.original_name,
                &file.content_type,
                &file.data,
                form.captions.get(&index).cloned(),
            )
        })
        .collect()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/posts (multipart: content, community, files, captions[i])
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = parse_upload_form(multipart).await?;

    let content = form.fields.get("content").cloned().unwrap_or_default();
    let community_id = form.fields.get("community").cloned().unwrap_or_default();

    if content.trim().is_empty() && form.files.is_empty() {
        return Err(ApiError::Validation("Post content is required".to_string()));
    }

    let community = state
        .db
        .communities
        .get(&community_id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !community.is_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You must be a member to post in this community".to_string(),
        ));
    }
    if community.is_banned_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You are restricted from posting in this community".to_string(),
        ));
    }

    let files = store_attachments(&state, &form)?;
    let post = Post::new(content, user.id.clone(), community.id.clone(), files);
    state.db.posts.insert(&post.id.clone(), post.clone());

    notification::notify_community_members(
        &state.db,
        &community,
        &user,
        NotificationKind::Post,
        format!("{} posted in {}.", user.name, community.name),
        &post.id,
    );

    Ok((
        StatusCode::CREATED,
        Json(post_view(&state.db, &post, None)),
    ))
}

/// GET /api/posts/feed
///
/// Posts from the approved communities the caller belongs to, pinned first,
/// newest first, capped at 50 with at most 5 embedded comments each.
pub async fn get_feed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<Vec<serde_json::Value>> {
    let community_ids: Vec<String> = state
        .db
        .communities
        .find(|c| c.is_member(&user.id) && c.status == CommunityStatus::Approved)
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut posts = state
        .db
        .posts
        .find(|p| community_ids.contains(&p.community));
    posts.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.created_at.cmp(&a.created_at))
    });
    posts.truncate(50);

    Json(
        posts
            .iter()
            .map(|p| post_view(&state.db, p, Some(5)))
            .collect(),
    )
}

/// POST /api/posts/:id/like — idempotent toggle on the like set.
pub async fn like_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let (liked, like_count) = state
        .db
        .posts
        .update(&id, |post| {
            let was_liked = post.likes.iter().any(|l| l == &user.id);
            if was_liked {
                post.likes.retain(|l| l != &user.id);
            } else {
                post.likes.push(user.id.clone());
            }
            (!was_liked, post.likes.len())
        })
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(json!({ "liked": liked, "likeCount": like_count })))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(default)]
    pub content: String,
}

/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.content.trim().is_empty() {
        return Err(ApiError::Validation(
            "Comment content is required".to_string(),
        ));
    }

    let post = state.db.posts.get(&id).ok_or(ApiError::NotFound("Post"))?;
    let community = state
        .db
        .communities
        .get(&post.community)
        .ok_or(ApiError::NotFound("Community"))?;

    if !community.is_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You must be a member to comment in this community".to_string(),
        ));
    }
    if community.is_banned_member(&user.id) {
        return Err(ApiError::Forbidden(
            "You are restricted from commenting in this community".to_string(),
        ));
    }

    let comment = Comment::new(request.content, user.id.clone(), post.id.clone());
    state.db.comments.insert(&comment.id.clone(), comment.clone());
    state.db.posts.update(&id, |p| {
        p.comments.push(comment.id.clone());
    });

    // Notify the post author, unless they commented on their own post.
    // relatedId points at the post so the client can open it directly.
    if post.author != user.id {
        notification::notify_user(
            &state.db,
            &post.author,
            NotificationKind::Comment,
            format!("{} commented on your post.", user.name),
            Some(post.id.clone()),
            Some(post.community.clone()),
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(comment_view(&state.db, &comment)),
    ))
}

/// DELETE /api/posts/:id — author or community admin.
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = state.db.posts.get(&id).ok_or(ApiError::NotFound("Post"))?;

    let is_author = post.author == user.id;
    if !is_author && !is_admin_for_post(&state.db, &post, &user) {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this post".to_string(),
        ));
    }

    // Comments first so nothing references a deleted post.
    state.db.comments.remove_where(|c| c.post == post.id);
    state.db.posts.remove(&post.id);

    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

/// POST /api/posts/:id/pin
///
/// Clears the pinned flag on every other post in the community first — at
/// most one pinned post per community.
pub async fn pin_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = state.db.posts.get(&id).ok_or(ApiError::NotFound("Post"))?;

    if !is_admin_for_post(&state.db, &post, &user) {
        return Err(ApiError::Forbidden(
            "Not authorized to pin posts".to_string(),
        ));
    }

    state.db.posts.update_all(|p| {
        if p.community == post.community {
            p.is_pinned = p.id == post.id;
        }
    });

    Ok(Json(json!({ "message": "Post pinned successfully" })))
}

/// POST /api/posts/:id/unpin
pub async fn unpin_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let post = state.db.posts.get(&id).ok_or(ApiError::NotFound("Post"))?;

    if !is_admin_for_post(&state.db, &post, &user) {
        return Err(ApiError::Forbidden(
            "Not authorized to unpin posts".to_string(),
        ));
    }

    state.db.posts.update(&id, |p| p.is_pinned = false);

    Ok(Json(json!({ "message": "Post unpinned successfully" })))
}

/// DELETE /api/posts/comments/:id — comment author or community admin.
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let comment = state
        .db
        .comments
        .get(&id)
        .ok_or(ApiError::NotFound("Comment"))?;
    let post = state
        .db
        .posts
        .get(&comment.post)
        .ok_or(ApiError::NotFound("Post"))?;

    let is_author = comment.author == user.id;
    if !is_author && !is_admin_for_post(&state.db, &post, &user) {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this comment".to_string(),
        ));
    }

    state.db.posts.update(&post.id, |p| {
        p.comments.retain(|c| c != &comment.id);
    });
    state.db.comments.remove(&comment.id);

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
