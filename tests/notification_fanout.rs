//! Notification fan-out on content creation and the read endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    create_community, multipart_request, register_admin, register_user, request, setup,
};
use townsquare::notification::{Notification, NotificationKind};

#[tokio::test]
async fn post_creation_notifies_members_except_the_author() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (alice_token, alice_id) = register_user(&app, "alice").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    for token in [&alice_token, &bob_token] {
        request(
            &app,
            "POST",
            &format!("/api/communities/{community_id}/join"),
            Some(token),
            None,
        )
        .await;
    }

    let (_, body) = multipart_request(
        &app,
        "/api/posts",
        &alice_token,
        &[("content", "hello"), ("community", &community_id)],
    )
    .await;
    let post_id = body["id"].as_str().unwrap().to_string();

    // bob got one notification of type post with the deep-link context.
    let (status, body) = request(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unreadCount"], 1);
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "post");
    assert_eq!(notifications[0]["relatedId"], post_id.as_str());
    assert_eq!(notifications[0]["relatedCommunityId"], community_id.as_str());
    assert_eq!(notifications[0]["message"], "alice posted in Garden Club.");

    // The author got none.
    assert_eq!(state.db.notifications.count(|n| n.user == alice_id), 0);
    assert_eq!(state.db.notifications.count(|n| n.user == bob_id), 1);
}

#[tokio::test]
async fn commenting_notifies_the_post_author_only_for_others() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, _) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/join"),
        Some(&bob_token),
        None,
    )
    .await;

    let (_, body) = multipart_request(
        &app,
        "/api/posts",
        &admin_token,
        &[("content", "admin post"), ("community", &community_id)],
    )
    .await;
    let post_id = body["id"].as_str().unwrap().to_string();

    // Fan-out from the post itself went to bob; clear it for a clean slate.
    state.db.notifications.remove_where(|_| true);

    // Commenting on your own post does not notify.
    request(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&admin_token),
        Some(json!({ "content": "self comment" })),
    )
    .await;
    assert_eq!(state.db.notifications.len(), 0);

    // Someone else commenting notifies the author.
    request(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&bob_token),
        Some(json!({ "content": "bob's comment" })),
    )
    .await;

    let all = state.db.notifications.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].kind, NotificationKind::Comment);
    assert_eq!(all[0].message, "bob commented on your post.");
    assert_eq!(all[0].related_id.as_deref(), Some(post_id.as_str()));
}

#[tokio::test]
async fn event_and_announcement_creation_fan_out() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/join"),
        Some(&bob_token),
        None,
    )
    .await;

    request(
        &app,
        "POST",
        "/api/events",
        Some(&admin_token),
        Some(json!({
            "title": "Cleanup",
            "description": "Spring cleanup",
            "date": "2026-09-01T00:00:00Z",
            "time": "09:00",
            "location": "Main St",
            "community": community_id,
        })),
    )
    .await;
    request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/announcements"),
        Some(&admin_token),
        Some(json!({ "title": "Tools needed", "content": "Bring gloves" })),
    )
    .await;

    let bobs: Vec<Notification> = state.db.notifications.find(|n| n.user == bob_id);
    assert_eq!(bobs.len(), 2);
    assert!(bobs.iter().any(|n| n.kind == NotificationKind::Event
        && n.message == "New event: \"Cleanup\" in Garden Club."));
    assert!(bobs.iter().any(|n| n.kind == NotificationKind::Announcement
        && n.message == "New announcement in Garden Club: Tools needed"));
}

#[tokio::test]
async fn legacy_announcement_notifications_get_community_backfilled() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    let (_, body) = request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/announcements"),
        Some(&admin_token),
        Some(json!({ "title": "Old news", "content": "From before" })),
    )
    .await;
    let announcement_id = body["id"].as_str().unwrap().to_string();

    // A record written before relatedCommunityId existed.
    let legacy = Notification::new(
        bob_id.clone(),
        NotificationKind::Announcement,
        "New announcement".to_string(),
        Some(announcement_id),
        None,
    );
    state.db.notifications.insert(&legacy.id.clone(), legacy);

    let (_, body) = request(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["relatedCommunityId"], community_id.as_str());
}

#[tokio::test]
async fn notifications_are_owner_scoped_and_markable() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (alice_token, _) = register_user(&app, "alice").await;
    let (bob_token, _) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    for token in [&alice_token, &bob_token] {
        request(
            &app,
            "POST",
            &format!("/api/communities/{community_id}/join"),
            Some(token),
            None,
        )
        .await;
    }

    multipart_request(
        &app,
        "/api/posts",
        &alice_token,
        &[("content", "hello"), ("community", &community_id)],
    )
    .await;

    let (_, body) = request(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    let id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    // alice cannot mark bob's notification.
    let (status, _) = request(
        &app,
        "PATCH",
        &format!("/api/notifications/{id}/read"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // bob can.
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/api/notifications/{id}/read"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRead"], true);

    let (_, body) = request(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    assert_eq!(body["unreadCount"], 0);

    // read-all clears anything left.
    multipart_request(
        &app,
        "/api/posts",
        &alice_token,
        &[("content", "again"), ("community", &community_id)],
    )
    .await;
    let (status, _) = request(
        &app,
        "PATCH",
        "/api/notifications/read-all",
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = request(&app, "GET", "/api/notifications", Some(&bob_token), None).await;
    assert_eq!(body["unreadCount"], 0);
}
