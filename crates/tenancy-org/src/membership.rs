//! Membership domain models
//!
//! A member row links one user to one organization with a role. There is at
//! most one row per (organization, user) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_rbac::Role;
use uuid::Uuid;

/// Organization membership linking a user to an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenancy_org::Member;
/// use tenancy_rbac::Role;
///
/// let membership = Member::new(Uuid::now_v7(), Uuid::now_v7(), Role::Admin);
/// assert_eq!(membership.role, Role::Admin);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Unique membership ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// User ID (owned by the identity collaborator)
    pub user_id: Uuid,

    /// Role within the organization
    pub role: Role,

    /// When the user joined
    pub created_at: DateTime<Utc>,

    /// When the role last changed
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Creates a new membership with a fresh UUID v7 ID and current timestamps.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - The organization ID
    /// * `user_id` - The user ID
    /// * `role` - The user's role in the organization
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this member holds the owner role.
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// A member joined with the identity fields shown in rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberWithUser {
    /// Unique membership ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organization
    pub role: Role,

    /// User email
    pub email: String,

    /// User display name
    pub name: String,

    /// Avatar URL
    pub picture: Option<String>,

    /// When the user joined
    pub created_at: DateTime<Utc>,

    /// When the role last changed
    pub updated_at: DateTime<Utc>,
}

/// Roster ordering: owners, then admins, then members; ties broken by name.
pub fn sort_roster(members: &mut [MemberWithUser]) {
    members.sort_by(|a, b| {
        a.role
            .listing_rank()
            .cmp(&b.role.listing_rank())
            .then_with(|| a.name.cmp(&b.name))
    });
}
