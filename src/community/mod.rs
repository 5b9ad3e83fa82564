//! Communities: membership, per-community role resolution, and the join
//! approval workflow.

pub mod api;
mod types;

pub use types::{Community, CommunityStatus};

use crate::users::User;

/// A user's resolved standing within one community.
///
/// Recomputed on every request from the community document and the caller's
/// platform role — never cached or stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityRole {
    Creator,
    Moderator,
    Member,
    None,
}

/// Resolve a user's role within a community.
///
/// Platform admins are treated as moderators everywhere so every admin gate
/// passes for them, without claiming creator status.
pub fn resolve_role(user: &User, community: &Community) -> CommunityRole {
    if community.creator == user.id {
        CommunityRole::Creator
    } else if community.moderators.iter().any(|m| m == &user.id) || user.is_admin() {
        CommunityRole::Moderator
    } else if community.members.iter().any(|m| m == &user.id) {
        CommunityRole::Member
    } else {
        CommunityRole::None
    }
}

/// Whether the user may administer the community: creator, moderator, or
/// platform admin.
pub fn is_community_admin(user: &User, community: &Community) -> bool {
    matches!(
        resolve_role(user, community),
        CommunityRole::Creator | CommunityRole::Moderator
    )
}
