//! Community document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-level approval state. Settable only by a platform admin; members
/// cannot join a community that is not approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityStatus {
    Pending,
    Approved,
    Rejected,
}

/// A named, location-scoped group with membership and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: String,
    pub name: String,
    pub description: String,
    pub city: String,
    pub state: String,
    /// Owning user; implicitly a community admin and never removable.
    pub creator: String,
    #[serde(default)]
    pub moderators: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
    /// Join requests awaiting approval. Mutually exclusive with `members`.
    #[serde(default)]
    pub pending_members: Vec<String>,
    #[serde(default)]
    pub banned_members: Vec<String>,
    pub status: CommunityStatus,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub rules: Option<String>,
    /// Derived from `members.len()`; recomputed on every save via [`Community::touch`].
    #[serde(default)]
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Community {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: String,
        city: String,
        state: String,
        creator: String,
        rules: Option<String>,
        requires_approval: bool,
        status: CommunityStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            city,
            state,
            creator: creator.clone(),
            moderators: Vec::new(),
            members: vec![creator],
            pending_members: Vec::new(),
            banned_members: Vec::new(),
            status,
            requires_approval,
            rules,
            member_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute derived fields. Call at the end of every mutation.
    pub fn touch(&mut self) {
        self.member_count = self.members.len();
        self.updated_at = Utc::now();
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.pending_members.iter().any(|m| m == user_id)
    }

    pub fn is_banned_member(&self, user_id: &str) -> bool {
        self.banned_members.iter().any(|m| m == user_id)
    }
}
