//! Posts, comments, likes, and the single-pinned-item invariant.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    create_community, multipart_request, register_admin, register_user, request, setup,
};

async fn join(app: &axum::Router, token: &str, community_id: &str) {
    let (status, _) = request(
        app,
        "POST",
        &format!("/api/communities/{community_id}/join"),
        Some(token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_post(app: &axum::Router, token: &str, community_id: &str, content: &str) -> String {
    let (status, body) = multipart_request(
        app,
        "/api/posts",
        token,
        &[("content", content), ("community", community_id)],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "post creation failed: {body}");
    body["id"].as_str().expect("post id").to_string()
}

#[tokio::test]
async fn non_members_and_banned_members_cannot_post() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, bob_id) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;

    // Outsider
    let (status, body) = multipart_request(
        &app,
        "/api/posts",
        &bob_token,
        &[("content", "hello"), ("community", &community_id)],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You must be a member to post in this community");

    // Member, but banned from the community
    join(&app, &bob_token, &community_id).await;
    state.db.communities.update(&community_id, |c| {
        c.banned_members.push(bob_id.clone());
    });

    let (status, body) = multipart_request(
        &app,
        "/api/posts",
        &bob_token,
        &[("content", "hello"), ("community", &community_id)],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are restricted from posting in this community");

    // Comments are gated the same way.
    let post_id = create_post(&app, &admin_token, &community_id, "admin post").await;
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&bob_token),
        Some(json!({ "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are restricted from commenting in this community");

    // And so are announcements.
    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/announcements"),
        Some(&bob_token),
        Some(json!({ "title": "Banned", "content": "should fail" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are restricted from creating announcements");
}

#[tokio::test]
async fn like_is_an_idempotent_toggle() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    let post_id = create_post(&app, &admin_token, &community_id, "hello").await;

    let uri = format!("/api/posts/{post_id}/like");

    let (_, body) = request(&app, "POST", &uri, Some(&admin_token), None).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["likeCount"], 1);

    let (_, body) = request(&app, "POST", &uri, Some(&admin_token), None).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["likeCount"], 0);
}

#[tokio::test]
async fn pinning_a_post_unpins_every_other_post_in_the_community() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;

    let p1 = create_post(&app, &admin_token, &community_id, "first").await;
    let p2 = create_post(&app, &admin_token, &community_id, "second").await;

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/posts/{p1}/pin"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/posts/{p2}/pin"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(!state.db.posts.get(&p1).unwrap().is_pinned);
    assert!(state.db.posts.get(&p2).unwrap().is_pinned);

    // The community listing reflects it, pinned first.
    let (_, body) = request(
        &app,
        "GET",
        &format!("/api/communities/{community_id}/posts"),
        Some(&admin_token),
        None,
    )
    .await;
    let posts = body.as_array().unwrap();
    assert_eq!(posts[0]["id"], p2.as_str());
    assert_eq!(posts[0]["isPinned"], true);
    assert!(posts[1..].iter().all(|p| p["isPinned"] == false));
}

#[tokio::test]
async fn pinning_is_scoped_per_community() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let c1 = create_community(&app, &admin_token, "Club One", "Springfield", false).await;
    let c2 = create_community(&app, &admin_token, "Club Two", "Springfield", false).await;

    let p1 = create_post(&app, &admin_token, &c1, "in one").await;
    let p2 = create_post(&app, &admin_token, &c2, "in two").await;

    for post in [&p1, &p2] {
        request(
            &app,
            "POST",
            &format!("/api/posts/{post}/pin"),
            Some(&admin_token),
            None,
        )
        .await;
    }

    // One pinned post per community — both stay pinned.
    assert!(state.db.posts.get(&p1).unwrap().is_pinned);
    assert!(state.db.posts.get(&p2).unwrap().is_pinned);
}

#[tokio::test]
async fn only_admins_pin_and_only_authors_or_admins_delete() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, _) = register_user(&app, "bob").await;
    let (carol_token, _) = register_user(&app, "carol").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &bob_token, &community_id).await;
    join(&app, &carol_token, &community_id).await;

    let post_id = create_post(&app, &bob_token, &community_id, "bob's post").await;

    // Plain member cannot pin.
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/pin"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Another member cannot delete bob's post.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&carol_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The author can.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.db.posts.get(&post_id).is_none());
}

#[tokio::test]
async fn deleting_a_post_deletes_its_comments() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    let post_id = create_post(&app, &admin_token, &community_id, "hello").await;

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&admin_token),
        Some(json!({ "content": "first!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["id"].as_str().unwrap().to_string();

    request(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&admin_token),
        None,
    )
    .await;

    assert!(state.db.comments.get(&comment_id).is_none());
}

#[tokio::test]
async fn feed_shows_posts_from_joined_approved_communities_pinned_first() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, _) = register_user(&app, "bob").await;

    let joined = create_community(&app, &admin_token, "Joined Club", "Springfield", false).await;
    let other = create_community(&app, &admin_token, "Other Club", "Springfield", false).await;
    join(&app, &bob_token, &joined).await;

    let p1 = create_post(&app, &admin_token, &joined, "older").await;
    let p2 = create_post(&app, &admin_token, &joined, "newer").await;
    create_post(&app, &admin_token, &other, "invisible to bob").await;

    request(
        &app,
        "POST",
        &format!("/api/posts/{p1}/pin"),
        Some(&admin_token),
        None,
    )
    .await;

    let (status, body) = request(&app, "GET", "/api/posts/feed", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    // Pinned post leads even though it's older.
    assert_eq!(posts[0]["id"], p1.as_str());
    assert_eq!(posts[1]["id"], p2.as_str());
}

#[tokio::test]
async fn announcement_pinning_keeps_at_most_one_pinned() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;

    let mut ids = Vec::new();
    for title in ["First", "Second"] {
        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/communities/{community_id}/announcements"),
            Some(&admin_token),
            Some(json!({ "title": title, "content": "content" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    for id in &ids {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/announcements/{id}/pin"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let first = state.db.announcements.get(&ids[0]).unwrap();
    let second = state.db.announcements.get(&ids[1]).unwrap();
    assert!(!first.is_pinned);
    assert!(first.pinned_at.is_none());
    assert!(second.is_pinned);
    assert!(second.pinned_at.is_some());
}

#[tokio::test]
async fn announcements_are_author_edit_only() {
    let (app, state) = setup();
    let (admin_token, _) = register_admin(&app, &state, "root").await;
    let (bob_token, _) = register_user(&app, "bob").await;

    let community_id = create_community(&app, &admin_token, "Garden Club", "Springfield", false).await;
    join(&app, &bob_token, &community_id).await;

    let (_, body) = request(
        &app,
        "POST",
        &format!("/api/communities/{community_id}/announcements"),
        Some(&bob_token),
        Some(json!({ "title": "Yard sale", "content": "Saturday" })),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    // Even the community admin cannot edit someone else's announcement.
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/announcements/{id}"),
        Some(&admin_token),
        Some(json!({ "title": "Changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // But the admin may delete it.
    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/announcements/{id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.db.announcements.get(&id).is_none());
}
