//! Cascading deletion sequences for the two destructive root operations.
//!
//! Each sequence is a fixed, ordered list of dependent-record deletions —
//! comments before their posts so nothing orphaned ever references a deleted
//! parent. Steps run best-effort in order with no compensating rollback: a
//! mid-sequence failure leaves partial state (accepted limitation).

use super::Database;

/// Delete a community and every record that references it.
///
/// Order: comments on the community's posts → posts → events →
/// community-scoped messages → notifications referencing the community →
/// announcements → the community record itself.
///
/// Returns false when the community does not exist.
pub fn delete_community(db: &Database, community_id: &str) -> bool {
    if !db.communities.contains(community_id) {
        return false;
    }

    let post_ids: Vec<String> = db
        .posts
        .find(|p| p.community == community_id)
        .into_iter()
        .map(|p| p.id)
        .collect();

    let comments = db.comments.remove_where(|c| post_ids.contains(&c.post));
    let posts = db.posts.remove_where(|p| p.community == community_id);
    let events = db.events.remove_where(|e| e.community == community_id);
    let messages = db.messages.remove_where(|m| m.community == community_id);
    let notifications = db
        .notifications
        .remove_where(|n| n.related_community_id.as_deref() == Some(community_id));
    let announcements = db
        .announcements
        .remove_where(|a| a.community == community_id);

    db.communities.remove(community_id);

    tracing::info!(
        community_id,
        posts,
        comments,
        events,
        messages,
        notifications,
        announcements,
        "Community deleted with cascade"
    );

    true
}

/// Delete a user account and every record that references it.
///
/// Order: comments on the user's posts → the user's own comments → the user
/// stripped from post like-sets → the user's posts → events the user created
/// → the user stripped from attendee-sets → all messages sent or received by
/// the user → the user stripped from every community's membership sets →
/// communities the user created (each with the full community cascade) → the
/// user's notifications → the user record.
///
/// Returns false when the user does not exist.
pub fn delete_user_account(db: &Database, user_id: &str) -> bool {
    if !db.users.contains(user_id) {
        return false;
    }

    let own_post_ids: Vec<String> = db
        .posts
        .find(|p| p.author == user_id)
        .into_iter()
        .map(|p| p.id)
        .collect();

    db.comments
        .remove_where(|c| own_post_ids.contains(&c.post) || c.author == user_id);

    db.posts.update_all(|p| {
        p.likes.retain(|id| id != user_id);
        p.comments.retain(|id| db.comments.contains(id));
    });
    db.posts.remove_where(|p| p.author == user_id);

    db.events.remove_where(|e| e.creator == user_id);
    db.events.update_all(|e| {
        e.attendees.retain(|id| id != user_id);
    });

    db.messages
        .remove_where(|m| m.sender == user_id || m.receiver == user_id);

    db.communities.update_all(|c| {
        c.members.retain(|id| id != user_id);
        c.moderators.retain(|id| id != user_id);
        c.pending_members.retain(|id| id != user_id);
        c.banned_members.retain(|id| id != user_id);
        c.touch();
    });

    let created: Vec<String> = db
        .communities
        .find(|c| c.creator == user_id)
        .into_iter()
        .map(|c| c.id)
        .collect();
    for community_id in created {
        delete_community(db, &community_id);
    }

    db.notifications.remove_where(|n| n.user == user_id);
    db.users.remove(user_id);

    tracing::info!(user_id, "User account deleted with cascade");

    true
}
