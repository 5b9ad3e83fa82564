//! Community endpoints: creation, discovery, membership workflow, and
//! member management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{is_community_admin, Community, CommunityStatus};
use crate::auth::AuthUser;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ── View helpers ─────────────────────────────────────────────────────────────

/// Short `{id, name}` reference for an embedded user.
pub(crate) fn user_name_ref(db: &Database, user_id: &str) -> serde_json::Value {
    match db.users.get(user_id) {
        Some(user) => json!({ "id": user.id, "name": user.name }),
        None => json!({ "id": user_id }),
    }
}

/// `{id, name, username}` reference for an embedded user.
pub(crate) fn user_ref(db: &Database, user_id: &str) -> serde_json::Value {
    match db.users.get(user_id) {
        Some(user) => json!({ "id": user.id, "name": user.name, "username": user.username }),
        None => json!({ "id": user_id }),
    }
}

fn community_value(community: &Community) -> serde_json::Value {
    serde_json::to_value(community).unwrap_or_else(|_| json!({}))
}

/// Community with the creator reference populated.
fn community_with_creator(db: &Database, community: &Community) -> serde_json::Value {
    let mut value = community_value(community);
    value["creator"] = user_name_ref(db, &community.creator);
    value
}

// ── Create / list ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub rules: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
}

/// POST /api/communities
///
/// New communities start `pending` until a platform admin approves them;
/// communities created by a platform admin are approved immediately.
pub async fn create_community(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCommunityRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.name.trim().is_empty()
        || request.description.trim().is_empty()
        || request.city.trim().is_empty()
        || request.state.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "Please provide name, description, city, and state".to_string(),
        ));
    }

    let status = if user.is_admin() {
        CommunityStatus::Approved
    } else {
        CommunityStatus::Pending
    };

    let community = Community::new(
        request.name.trim().to_string(),
        request.description.trim().to_string(),
        request.city.trim().to_string(),
        request.state.trim().to_string(),
        user.id.clone(),
        request.rules,
        request.requires_approval,
        status,
    );

    state
        .db
        .communities
        .insert(&community.id.clone(), community.clone());

    tracing::info!(community_id = %community.id, creator = %user.id, status = ?status, "Community created");

    Ok((StatusCode::CREATED, Json(community)))
}

#[derive(Debug, Deserialize)]
pub struct CommunityFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub search: Option<String>,
}

/// GET /api/communities?city=&state=&search=
///
/// Public listing of approved communities, newest first.
pub async fn get_communities(
    State(state): State<AppState>,
    Query(filter): Query<CommunityFilter>,
) -> Json<Vec<serde_json::Value>> {
    let search = filter.search.as_deref().map(str::to_lowercase);

    let mut communities = state.db.communities.find(|c| {
        c.status == CommunityStatus::Approved
            && filter.city.as_deref().map_or(true, |city| c.city == city)
            && filter.state.as_deref().map_or(true, |st| c.state == st)
            && search.as_deref().map_or(true, |needle| {
                c.name.to_lowercase().contains(needle)
                    || c.description.to_lowercase().contains(needle)
            })
    });
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        communities
            .iter()
            .map(|c| community_with_creator(&state.db, c))
            .collect(),
    )
}

/// GET /api/communities/my — approved communities the caller belongs to,
/// plus any community they created (so pending ones remain visible).
pub async fn get_my_communities(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<Vec<serde_json::Value>> {
    let mut communities = state.db.communities.find(|c| {
        (c.is_member(&user.id) && c.status == CommunityStatus::Approved) || c.creator == user.id
    });
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(
        communities
            .iter()
            .map(|c| community_with_creator(&state.db, c))
            .collect(),
    )
}

/// GET /api/communities/my/admin — communities the caller created or
/// moderates, annotated with their admin role.
pub async fn get_my_admin_communities(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<Vec<serde_json::Value>> {
    let mut communities = state
        .db
        .communities
        .find(|c| c.creator == user.id || c.moderators.iter().any(|m| m == &user.id));
    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let items = communities
        .iter()
        .map(|c| {
            let mut value = community_value(c);
            value["creator"] = user_ref(&state.db, &c.creator);
            value["moderators"] = c
                .moderators
                .iter()
                .map(|m| user_ref(&state.db, m))
                .collect();
            value["pendingMembers"] = c
                .pending_members
                .iter()
                .map(|m| user_ref(&state.db, m))
                .collect();
            value["adminRole"] = if c.creator == user.id {
                json!("creator")
            } else {
                json!("moderator")
            };
            value
        })
        .collect();

    Json(items)
}

/// GET /api/communities/:id
///
/// Includes the caller's membership flags. The pending-member list is only
/// exposed to community admins.
pub async fn get_community(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let community = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;

    let admin = is_community_admin(&user, &community);

    let mut value = community_value(&community);
    value["creator"] = user_ref(&state.db, &community.creator);
    value["members"] = community
        .members
        .iter()
        .map(|m| user_ref(&state.db, m))
        .collect();
    value["isMember"] = json!(community.is_member(&user.id));
    value["isPending"] = json!(community.is_pending(&user.id));
    value["isCommunityAdmin"] = json!(admin);

    if admin {
        value["pendingMembers"] = community
            .pending_members
            .iter()
            .map(|m| user_ref(&state.db, m))
            .collect();
    } else if let Some(map) = value.as_object_mut() {
        map.remove("pendingMembers");
    }

    Ok(Json(value))
}

// ── Join workflow ────────────────────────────────────────────────────────────

/// POST /api/communities/:id/join
///
/// Joining an approval-required community files a pending request instead of
/// granting membership. Duplicate attempts are rejected with a descriptive
/// error rather than silently succeeding.
pub async fn join_community(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let message = state
        .db
        .communities
        .update(&id, |c| {
            if c.status != CommunityStatus::Approved {
                return Err(ApiError::Validation(
                    "Community is not approved yet".to_string(),
                ));
            }
            if c.is_member(&user.id) {
                return Err(ApiError::Validation("Already a member".to_string()));
            }

            if c.requires_approval {
                if c.is_pending(&user.id) {
                    return Err(ApiError::Validation(
                        "Join request is already pending".to_string(),
                    ));
                }
                c.pending_members.push(user.id.clone());
                c.touch();
                Ok("Join request sent and pending approval")
            } else {
                c.members.push(user.id.clone());
                c.touch();
                Ok("Joined community successfully")
            }
        })
        .ok_or(ApiError::NotFound("Community"))??;

    Ok(Json(json!({ "message": message })))
}

/// POST /api/communities/:id/requests/:userId/approve
pub async fn approve_member(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, member_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let community = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !is_community_admin(&user, &community) {
        return Err(ApiError::Forbidden(
            "Not authorized to approve members".to_string(),
        ));
    }

    state
        .db
        .communities
        .update(&id, |c| {
            if !c.is_pending(&member_id) {
                return Err(ApiError::Validation(
                    "User does not have a pending request".to_string(),
                ));
            }
            c.pending_members.retain(|m| m != &member_id);
            if !c.is_member(&member_id) {
                c.members.push(member_id.clone());
            }
            c.touch();
            Ok(())
        })
        .ok_or(ApiError::NotFound("Community"))??;

    Ok(Json(json!({ "message": "Member approved successfully" })))
}

/// POST /api/communities/:id/requests/:userId/reject
pub async fn reject_member(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, member_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let community = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !is_community_admin(&user, &community) {
        return Err(ApiError::Forbidden(
            "Not authorized to reject members".to_string(),
        ));
    }

    state
        .db
        .communities
        .update(&id, |c| {
            if !c.is_pending(&member_id) {
                return Err(ApiError::Validation(
                    "User does not have a pending request".to_string(),
                ));
            }
            c.pending_members.retain(|m| m != &member_id);
            c.touch();
            Ok(())
        })
        .ok_or(ApiError::NotFound("Community"))??;

    Ok(Json(json!({ "message": "Join request rejected" })))
}

/// DELETE /api/communities/:id/members/:userId
///
/// The creator can never be removed.
pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, member_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let community = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !is_community_admin(&user, &community) {
        return Err(ApiError::Forbidden(
            "Not authorized to remove members".to_string(),
        ));
    }

    if community.creator == member_id {
        return Err(ApiError::Validation(
            "Cannot remove the community creator".to_string(),
        ));
    }

    state.db.communities.update(&id, |c| {
        c.members.retain(|m| m != &member_id);
        c.touch();
    });

    Ok(Json(json!({ "message": "Member removed from community" })))
}

// ── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub rules: Option<String>,
    pub requires_approval: Option<bool>,
}

/// PATCH /api/communities/:id/settings
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Community>> {
    let community = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;

    if !is_community_admin(&user, &community) {
        return Err(ApiError::Forbidden(
            "Not authorized to update settings".to_string(),
        ));
    }

    state.db.communities.update(&id, |c| {
        if let Some(rules) = &request.rules {
            c.rules = Some(rules.clone());
        }
        if let Some(requires_approval) = request.requires_approval {
            c.requires_approval = requires_approval;
        }
        c.touch();
    });

    let updated = state
        .db
        .communities
        .get(&id)
        .ok_or(ApiError::NotFound("Community"))?;
    Ok(Json(updated))
}

// ── Scoped content listings ──────────────────────────────────────────────────

/// GET /api/communities/:id/posts — pinned first, then newest.
pub async fn get_community_posts(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut posts = state.db.posts.find(|p| p.community == id);
    posts.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.created_at.cmp(&a.created_at))
    });

    Json(
        posts
            .iter()
            .map(|p| crate::post::api::post_view(&state.db, p, None))
            .collect(),
    )
}

/// GET /api/communities/:id/events — soonest first.
pub async fn get_community_events(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Json<Vec<serde_json::Value>> {
    let mut events = state.db.events.find(|e| e.community == id);
    events.sort_by(|a, b| a.date.cmp(&b.date));

    Json(
        events
            .iter()
            .map(|e| crate::event::api::event_view(&state.db, e))
            .collect(),
    )
}
