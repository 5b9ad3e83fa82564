//! Post and comment document models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::upload::FileAttachment;

/// A post in a community's feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: String,
    pub community: String,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
    /// User IDs who liked the post. Toggle semantics; see the like endpoint.
    #[serde(default)]
    pub likes: Vec<String>,
    /// Ordered comment IDs.
    #[serde(default)]
    pub comments: Vec<String>,
    /// At most one pinned post per community; pinning clears the others.
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(content: String, author: String, community: String, files: Vec<FileAttachment>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            author,
            community,
            files,
            likes: Vec::new(),
            comments: Vec::new(),
            is_pinned: false,
            created_at: Utc::now(),
        }
    }
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub post: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(content: String, author: String, post: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            author,
            post,
            created_at: Utc::now(),
        }
    }
}
