//! Notification records and best-effort fan-out.
//!
//! Content creation fans one lightweight record out to each affected
//! recipient. Fan-out never blocks or fails the primary operation — any
//! storage problem is logged and swallowed.

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::community::Community;
use crate::db::Database;
use crate::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Post,
    Comment,
    Event,
    Community,
    System,
    Announcement,
}

/// A notification targeted at one user. Carries enough denormalized context
/// (`message`, `related_id`, `related_community_id`) for the client to
/// deep-link without further joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub related_community_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user: String,
        kind: NotificationKind,
        message: String,
        related_id: Option<String>,
        related_community_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            kind,
            message,
            related_id,
            related_community_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Notify every member of a community except the actor.
///
/// Best-effort: a failure here must never surface to the caller.
pub fn notify_community_members(
    db: &Database,
    community: &Community,
    actor: &User,
    kind: NotificationKind,
    message: String,
    related_id: &str,
) {
    let records: Vec<Notification> = community
        .members
        .iter()
        .filter(|member| *member != &actor.id)
        .map(|member| {
            Notification::new(
                member.clone(),
                kind,
                message.clone(),
                Some(related_id.to_string()),
                Some(community.id.clone()),
            )
        })
        .collect();

    if records.is_empty() {
        return;
    }

    let count = records.len();
    db.notifications
        .insert_many(records.into_iter().map(|n| (n.id.clone(), n)));

    tracing::debug!(
        community_id = %community.id,
        recipients = count,
        kind = ?kind,
        "Notification fan-out"
    );
}

/// Notify a single user (e.g. a post author about a new comment).
pub fn notify_user(
    db: &Database,
    user_id: &str,
    kind: NotificationKind,
    message: String,
    related_id: Option<String>,
    related_community_id: Option<String>,
) {
    let record = Notification::new(
        user_id.to_string(),
        kind,
        message,
        related_id,
        related_community_id,
    );
    db.notifications.insert(&record.id.clone(), record);
}
