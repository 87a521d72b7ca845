//! Organization domain models
//!
//! This module provides the Organization entity, the tenant boundary that
//! groups members and invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_rbac::Role;
use uuid::Uuid;

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles.
/// The organization exclusively owns its member and invitation rows:
/// deleting it deletes them.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Members (via Member, at least one owner)
///   └─ Invitations (pending / accepted / declined / expired)
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenancy_org::Organization;
///
/// let creator = Uuid::now_v7();
/// let org = Organization::new("Acme Corp", "acme-corp-0190a1b2", creator);
/// assert_eq!(org.name, "Acme Corp");
/// assert_eq!(org.created_by, creator);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name (mutable)
    pub name: String,

    /// URL-friendly slug, unique across the system and fixed at creation
    pub slug: String,

    /// The user who created the organization
    #[serde(skip_serializing, default = "Uuid::nil")]
    pub created_by: Uuid,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization row.
    ///
    /// The organization is created with a newly generated UUID v7 ID and
    /// the current timestamp for `created_at` and `updated_at`. It is not
    /// persisted until handed to a
    /// [`MembershipStore`](crate::store::MembershipStore).
    ///
    /// # Arguments
    ///
    /// * `name` - The organization name
    /// * `slug` - URL-friendly slug (must be unique)
    /// * `created_by` - The user ID of the creator, who becomes the first owner
    pub fn new(name: impl Into<String>, slug: impl Into<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pair the organization with the viewer's role.
    pub fn with_role(self, role: Role) -> OrganizationWithRole {
        OrganizationWithRole {
            organization: self,
            role,
        }
    }
}

/// An organization as seen by one of its members.
///
/// Serializes flat: the organization fields plus `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationWithRole {
    /// The organization
    #[serde(flatten)]
    pub organization: Organization,

    /// The viewing user's role in it
    pub role: Role,
}
