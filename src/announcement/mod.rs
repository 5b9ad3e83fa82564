//! Community announcements.

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An announcement posted to a community. At most one pinned announcement
/// per community; pinning clears the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub community: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub pinned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: String, content: String, author: String, community: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content,
            author,
            community,
            is_pinned: false,
            pinned_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
