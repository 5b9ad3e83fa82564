//! Direct messages between members of a community.

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::upload::FileAttachment;

/// A direct message, scoped to the community both participants belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub community: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
    /// A post shared into the conversation; must belong to the same community.
    #[serde(default)]
    pub shared_post: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: String,
        receiver: String,
        community: String,
        content: String,
        files: Vec<FileAttachment>,
        shared_post: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            receiver,
            community,
            content,
            files,
            shared_post,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}
