//! Direct messaging: membership gating, post sharing, conversations, and
//! read tracking.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    create_community, multipart_request, register_admin, register_user, request, setup,
};

async fn join(app: &axum::Router, token: &str, community_id: &str) {
    request(
        app,
        "POST",
        &format!("/api/communities/{community_id}/join"),
        Some(token),
        None,
    )
    .await;
}

#[tokio::test]
async fn both_participants_must_be_members() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (alice_token, _) = register_user(&app, "alice").await;
    let (_bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &alice_token, &community_id).await;
    // bob never joins

    let (status, body) = multipart_request(
        &app,
        "/api/messages",
        &alice_token,
        &[
            ("receiverId", &bob_id),
            ("communityId", &community_id),
            ("content", "hi bob"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Both users must be members of the community");
}

#[tokio::test]
async fn shared_posts_must_come_from_the_same_community() {
    let (app, state) = setup();
    let (admin_token, admin_id) = register_admin(&app, &state, "root").await;
    let (alice_token, _) = register_user(&app, "alice").await;

    let c1 = create_community(&app, &admin_token, "Club One", "Springfield", false).await;
    let c2 = create_community(&app, &admin_token, "Club Two", "Springfield", false).await;
    join(&app, &alice_token, &c1).await;
    join(&app, &alice_token, &c2).await;

    let (_, body) = multipart_request(
        &app,
        "/api/posts",
        &alice_token,
        &[("content", "in club two"), ("community", &c2)],
    )
    .await;
    let foreign_post = body["id"].as_str().unwrap().to_string();

    let (status, body) = multipart_request(
        &app,
        "/api/messages",
        &alice_token,
        &[
            ("receiverId", &admin_id),
            ("communityId", &c1),
            ("postId", &foreign_post),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Post must be from the same community");

    // Sharing within the same community works and defaults the content.
    let (_, body) = multipart_request(
        &app,
        "/api/posts",
        &alice_token,
        &[("content", "in club one"), ("community", &c1)],
    )
    .await;
    let local_post = body["id"].as_str().unwrap().to_string();

    let (status, body) = multipart_request(
        &app,
        "/api/messages",
        &alice_token,
        &[
            ("receiverId", &admin_id),
            ("communityId", &c1),
            ("postId", &local_post),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "Shared a post");
    assert_eq!(body["sharedPost"]["id"], local_post.as_str());
    assert_eq!(body["sharedPost"]["content"], "in club one");
}

#[tokio::test]
async fn conversations_group_by_partner_with_unread_counts() {
    let (app, state) = setup();
    let (admin_token, admin_id) = register_admin(&app, &state, "root").await;
    let (alice_token, alice_id) = register_user(&app, "alice").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &alice_token, &community_id).await;
    join(&app, &bob_token, &community_id).await;

    // alice receives two from bob, one from the admin
    for content in ["hey", "you there?"] {
        multipart_request(
            &app,
            "/api/messages",
            &bob_token,
            &[
                ("receiverId", &alice_id),
                ("communityId", &community_id),
                ("content", content),
            ],
        )
        .await;
    }
    multipart_request(
        &app,
        "/api/messages",
        &admin_token,
        &[
            ("receiverId", &alice_id),
            ("communityId", &community_id),
            ("content", "welcome"),
        ],
    )
    .await;

    let (status, body) = request(
        &app,
        "GET",
        &format!("/api/messages/community/{community_id}/conversations"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversations = body.as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    // Newest conversation first — the admin's message arrived last.
    assert_eq!(conversations[0]["partner"]["id"], admin_id.as_str());
    assert_eq!(conversations[0]["unreadCount"], 1);
    assert_eq!(conversations[1]["partner"]["id"], bob_id.as_str());
    assert_eq!(conversations[1]["unreadCount"], 2);

    let (_, body) = request(&app, "GET", "/api/messages/unread-count", Some(&alice_token), None).await;
    assert_eq!(body["unreadCount"], 3);

    // Opening the thread with bob marks his messages read.
    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/messages/community/{community_id}/conversation/{bob_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    let thread = body.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["content"], "hey"); // oldest first

    let (_, body) = request(&app, "GET", "/api/messages/unread-count", Some(&alice_token), None).await;
    assert_eq!(body["unreadCount"], 1);

    let unread_from_bob = state
        .db
        .messages
        .count(|m| m.sender == bob_id && m.receiver == alice_id && !m.is_read);
    assert_eq!(unread_from_bob, 0);
}

#[tokio::test]
async fn only_the_sender_may_delete_a_message() {
    let (app, state) = setup();
    let (admin_token, admin_id) = register_admin(&app, &state, "root").await;
    let (alice_token, _) = register_user(&app, "alice").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &alice_token, &community_id).await;

    let (_, body) = multipart_request(
        &app,
        "/api/messages",
        &alice_token,
        &[
            ("receiverId", &admin_id),
            ("communityId", &community_id),
            ("content", "oops"),
        ],
    )
    .await;
    let message_id = body["id"].as_str().unwrap().to_string();

    // The receiver cannot delete it.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/messages/{message_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/messages/{message_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.db.messages.get(&message_id).is_none());
}

#[tokio::test]
async fn explicit_mark_read_clears_a_sender_thread() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (alice_token, alice_id) = register_user(&app, "alice").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &alice_token, &community_id).await;
    join(&app, &bob_token, &community_id).await;

    multipart_request(
        &app,
        "/api/messages",
        &bob_token,
        &[
            ("receiverId", &alice_id),
            ("communityId", &community_id),
            ("content", "ping"),
        ],
    )
    .await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/messages/mark-read",
        Some(&alice_token),
        Some(json!({ "senderId": bob_id, "communityId": community_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let message = state
        .db
        .messages
        .find_one(|m| m.sender == bob_id && m.receiver == alice_id)
        .unwrap();
    assert!(message.is_read);
    assert!(message.read_at.is_some());
}
