//! Event endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::Event;
use crate::auth::AuthUser;
use crate::community::api::{user_name_ref, user_ref};
use crate::community::{is_community_admin, CommunityStatus};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::notification::{self, NotificationKind};
use crate::state::AppState;

pub(crate) fn event_view(db: &Database, event: &Event) -> serde_json::Value {
    let mut value = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    value["creator"] = user_ref(db, &event.creator);
    value["community"] = match db.communities.get(&event.community) {
        Some(c) => json!({ "id": c.id, "name": c.name }),
        None => json!({ "id": event.community }),
    };
    value["attendees"] = event
        .attendees
        .iter()
        .map(|a| user_name_ref(db, a))
        .collect();
    value
}

/// IDs of communities whose events the caller can see: approved communities
/// they belong to, plus any community they created.
fn visible_community_ids(db: &Database, user_id: &str) -> Vec<String> {
    db.communities
        .find(|c| {
            (c.is_member(user_id) && c.status == CommunityStatus::Approved)
                || c.creator == user_id
        })
        .into_iter()
        .map(|c| c.id)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub community: String,
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.title.trim().is_empty()
        || request.description.trim().is_empty()
        || request.time.trim().is_empty()
        || request.location.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "Please provide title, description, date, time, and location".to_string(),
        ));
    }
    let date = request.date.ok_or_else(|| {
        ApiError::Validation("Please provide title, description, date, time, and location".to_string())
    })?;

    let community = state
        .db
        .communities
        .get(&request.community)
        .ok_or(ApiError::NotFound("Community"))?;

    let event = Event::new(
        request.title.trim().to_string(),
        request.description.trim().to_string(),
        date,
        request.time.trim().to_string(),
        request.location.trim().to_string(),
        community.id.clone(),
        user.id.clone(),
    );
    state.db.events.insert(&event.id.clone(), event.clone());

    notification::notify_community_members(
        &state.db,
        &community,
        &user,
        NotificationKind::Event,
        format!("New event: \"{}\" in {}.", event.title, community.name),
        &event.id,
    );

    Ok((
        StatusCode::CREATED,
        Json(event_view(&state.db, &event)),
    ))
}

/// GET /api/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let event = state.db.events.get(&id).ok_or(ApiError::NotFound("Event"))?;
    Ok(Json(event_view(&state.db, &event)))
}

/// GET /api/events/upcoming — events from today onward in the caller's
/// communities, soonest first, capped at 10.
pub async fn get_upcoming_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<Vec<serde_json::Value>> {
    let community_ids = visible_community_ids(&state.db, &user.id);

    // Today at midnight, so events earlier today still count as upcoming.
    let today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now);

    let mut events = state
        .db
        .events
        .find(|e| community_ids.contains(&e.community) && e.date >= today);
    events.sort_by(|a, b| a.date.cmp(&b.date));
    events.truncate(10);

    Json(events.iter().map(|e| event_view(&state.db, e)).collect())
}

/// GET /api/events/all — every event in the caller's communities.
pub async fn get_all_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<Vec<serde_json::Value>> {
    let community_ids = visible_community_ids(&state.db, &user.id);

    let mut events = state
        .db
        .events
        .find(|e| community_ids.contains(&e.community));
    events.sort_by(|a, b| a.date.cmp(&b.date));

    Json(events.iter().map(|e| event_view(&state.db, e)).collect())
}

/// POST /api/events/:id/attend — idempotent toggle on the attendee set.
pub async fn attend_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let was_attending = state
        .db
        .events
        .update(&id, |event| {
            let attending = event.attendees.iter().any(|a| a == &user.id);
            if attending {
                event.attendees.retain(|a| a != &user.id);
            } else {
                event.attendees.push(user.id.clone());
            }
            attending
        })
        .ok_or(ApiError::NotFound("Event"))?;

    let message = if was_attending { "Left event" } else { "Joined event" };
    Ok(Json(json!({ "message": message })))
}

/// DELETE /api/events/:id — event creator or community admin.
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let event = state.db.events.get(&id).ok_or(ApiError::NotFound("Event"))?;

    let is_creator = event.creator == user.id;
    let is_admin = state
        .db
        .communities
        .get(&event.community)
        .map(|c| is_community_admin(&user, &c))
        .unwrap_or(false);

    if !is_creator && !is_admin {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this event".to_string(),
        ));
    }

    state.db.events.remove(&event.id);

    Ok(Json(json!({ "message": "Event deleted successfully" })))
}
