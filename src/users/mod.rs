//! User accounts: model, public views, and profile/account endpoints.

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform-wide role. `Admin` bypasses every per-community check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// A registered user account as persisted. The password hash and reset-token
/// fields never leave the server — wire responses use [`UserView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Lowercased, globally unique.
    pub username: String,
    /// Lowercased, globally unique.
    pub email: String,
    pub password_hash: String,
    pub hometown: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default)]
    pub suspension_reason: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub ban_reason: Option<String>,
    /// SHA-256 hex of the outstanding password-reset token, if any.
    #[serde(default)]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public profile view — everything except credentials and reset state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub hometown: String,
    pub city: String,
    pub state: String,
    pub role: Role,
    pub is_suspended: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            hometown: user.hometown.clone(),
            city: user.city.clone(),
            state: user.state.clone(),
            role: user.role,
            is_suspended: user.is_suspended,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}
