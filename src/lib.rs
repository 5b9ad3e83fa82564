//! # Townsquare — community social platform server
//!
//! A REST/JSON service for location-scoped communities: posts and comments,
//! events with attendance, announcements, direct messages, notifications,
//! and platform/community moderation.
//!
//! Control flow for every write: bearer-token identity check → per-community
//! membership/role check (recomputed on each request, never cached) →
//! content mutation → best-effort notification fan-out → response.
//!
//! ## Module Organization
//!
//! - [`auth`] - Token issue/verify, password hashing, and the request gates
//! - [`users`] - Accounts, profiles, and full account deletion
//! - [`community`] - Membership workflow and per-community role resolution
//! - [`post`], [`event`], [`announcement`] - Community content
//! - [`message`] - Direct messages between community members
//! - [`notification`] - Fan-out records and read tracking
//! - [`admin`] - Platform administration and community approval
//! - [`db`] - Document store with per-collection JSON persistence
//! - [`upload`] - Attachment storage and static serving

pub mod admin;
pub mod announcement;
pub mod auth;
pub mod community;
pub mod db;
pub mod email;
pub mod error;
pub mod event;
pub mod message;
pub mod notification;
pub mod post;
pub mod state;
pub mod upload;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

/// JSON 404 for unknown routes.
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found" })),
    )
}

/// CORS policy: fixed local-dev origins plus the configured front end, with
/// a standing exception for Vercel preview deployments. The permissive mode
/// (development) allows any origin.
fn cors_layer(state: &AppState) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
    ];

    if state.config.permissive_cors {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let allowed: Vec<String> = vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        state.config.frontend_url.clone(),
    ];

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts| {
                origin
                    .to_str()
                    .map(|origin| {
                        allowed.iter().any(|a| a == origin) || origin.ends_with(".vercel.app")
                    })
                    .unwrap_or(false)
            },
        ))
        .allow_methods(methods)
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        // ── Auth ─────────────────────────────────────────────────────────
        .route("/auth/register", post(auth::api::register))
        .route("/auth/login", post(auth::api::login))
        .route("/auth/me", get(auth::api::me))
        .route("/auth/forgot-password", post(auth::api::forgot_password))
        .route("/auth/reset-password", post(auth::api::reset_password))
        // ── Communities ──────────────────────────────────────────────────
        .route(
            "/communities",
            post(community::api::create_community).get(community::api::get_communities),
        )
        .route("/communities/my", get(community::api::get_my_communities))
        .route(
            "/communities/my/admin",
            get(community::api::get_my_admin_communities),
        )
        .route("/communities/:id", get(community::api::get_community))
        .route("/communities/:id/join", post(community::api::join_community))
        .route(
            "/communities/:id/settings",
            patch(community::api::update_settings),
        )
        .route(
            "/communities/:id/requests/:userId/approve",
            post(community::api::approve_member),
        )
        .route(
            "/communities/:id/requests/:userId/reject",
            post(community::api::reject_member),
        )
        .route(
            "/communities/:id/members/:userId",
            delete(community::api::remove_member),
        )
        .route(
            "/communities/:id/posts",
            get(community::api::get_community_posts),
        )
        .route(
            "/communities/:id/events",
            get(community::api::get_community_events),
        )
        .route(
            "/communities/:id/announcements",
            get(announcement::api::get_announcements)
                .post(announcement::api::create_announcement_in_community),
        )
        // ── Posts & comments ─────────────────────────────────────────────
        .route("/posts", post(post::api::create_post))
        .route("/posts/feed", get(post::api::get_feed))
        .route("/posts/comments/:id", delete(post::api::delete_comment))
        .route("/posts/:id", delete(post::api::delete_post))
        .route("/posts/:id/like", post(post::api::like_post))
        .route("/posts/:id/comments", post(post::api::add_comment))
        .route("/posts/:id/pin", post(post::api::pin_post))
        .route("/posts/:id/unpin", post(post::api::unpin_post))
        // ── Events ───────────────────────────────────────────────────────
        .route("/events", post(event::api::create_event))
        .route("/events/all", get(event::api::get_all_events))
        .route("/events/upcoming", get(event::api::get_upcoming_events))
        .route(
            "/events/:id",
            get(event::api::get_event).delete(event::api::delete_event),
        )
        .route("/events/:id/attend", post(event::api::attend_event))
        // ── Announcements ────────────────────────────────────────────────
        .route(
            "/announcements",
            post(announcement::api::create_announcement),
        )
        .route(
            "/announcements/community/:id",
            get(announcement::api::get_announcements),
        )
        .route(
            "/announcements/:id",
            put(announcement::api::update_announcement)
                .delete(announcement::api::delete_announcement),
        )
        .route(
            "/announcements/:id/pin",
            post(announcement::api::pin_announcement),
        )
        .route(
            "/announcements/:id/unpin",
            post(announcement::api::unpin_announcement),
        )
        // ── Users ────────────────────────────────────────────────────────
        .route(
            "/users/me",
            put(users::api::update_me).delete(users::api::delete_me),
        )
        .route("/users/me/password", put(users::api::change_password))
        .route("/users/:id", get(users::api::get_user))
        .route("/users/:id/posts", get(users::api::get_user_posts))
        .route(
            "/users/:id/communities",
            get(users::api::get_user_communities),
        )
        // ── Messages ─────────────────────────────────────────────────────
        .route("/messages", post(message::api::send_message))
        .route("/messages/unread-count", get(message::api::get_unread_count))
        .route("/messages/mark-read", post(message::api::mark_as_read))
        .route(
            "/messages/community/:communityId/conversations",
            get(message::api::get_conversations),
        )
        .route(
            "/messages/community/:communityId/conversation/:receiverId",
            get(message::api::get_conversation),
        )
        .route("/messages/:id", delete(message::api::delete_message))
        // ── Notifications ────────────────────────────────────────────────
        .route(
            "/notifications",
            get(notification::api::get_my_notifications),
        )
        .route(
            "/notifications/read-all",
            patch(notification::api::mark_all_as_read),
        )
        .route(
            "/notifications/:id/read",
            patch(notification::api::mark_as_read),
        )
        // ── Admin ────────────────────────────────────────────────────────
        .route("/admin/stats", get(admin::api::get_stats))
        .route("/admin/users", get(admin::api::get_users))
        .route("/admin/users/:id/suspend", put(admin::api::suspend_user))
        .route(
            "/admin/users/:id/unsuspend",
            put(admin::api::unsuspend_user),
        )
        .route("/admin/users/:id/ban", put(admin::api::ban_user))
        .route("/admin/users/:id/unban", put(admin::api::unban_user))
        .route(
            "/admin/communities/pending",
            get(admin::api::get_pending_communities),
        )
        .route(
            "/admin/communities/all",
            get(admin::api::get_all_communities),
        )
        .route(
            "/admin/communities/:id/approve",
            put(admin::api::approve_community),
        )
        .route(
            "/admin/communities/:id/reject",
            put(admin::api::reject_community),
        )
        .route(
            "/admin/communities/:id",
            delete(admin::api::delete_community),
        )
        .route(
            "/admin/communities/:id/moderators/:userId",
            post(admin::api::assign_moderator).delete(admin::api::revoke_moderator),
        )
        .route(
            "/admin/admins",
            get(admin::api::get_admins).post(admin::api::create_admin),
        );

    let cors = cors_layer(&state);

    Router::new()
        .nest("/api", api)
        .route("/uploads/:filename", get(upload::serve_upload))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(
            upload::MAX_FILE_BYTES * upload::MAX_FILES_PER_ITEM + 1024 * 1024,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
