//! Role-based access control
//!
//! This module defines the organization role hierarchy and the table that
//! maps each role to the capabilities it grants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::capabilities::Capability;

/// User role within an organization.
///
/// Roles are totally ordered by privilege: Member < Admin < Owner.
///
/// # Permission Model
///
/// - **Member**: belongs to the organization, no management rights
/// - **Admin**: can manage members and invitations, rename the organization
/// - **Owner**: everything an admin can do, plus delete and transfer ownership
///
/// # Examples
///
/// ```
/// use tenancy_rbac::Role;
///
/// let admin = Role::Admin;
/// assert!(admin.can_manage_members());
/// assert!(!admin.can_delete_org());
///
/// assert!(Role::Owner > Role::Admin);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Plain member
    Member = 1,

    /// Can manage members and invitations
    Admin = 2,

    /// Full organization control
    Owner = 3,
}

/// Capabilities granted to each role.
///
/// Adding a role variant forces an update here: [`Role::capabilities`]
/// matches exhaustively on this table.
const MEMBER_CAPABILITIES: &[Capability] = &[];
const ADMIN_CAPABILITIES: &[Capability] = &[Capability::ManageMembers];
const OWNER_CAPABILITIES: &[Capability] = &[
    Capability::ManageMembers,
    Capability::DeleteOrganization,
    Capability::TransferOwnership,
];

/// Error returned when a string is not one of the enumerated roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0:?}")]
pub struct ParseRoleError(pub String);

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 3] = [Role::Member, Role::Admin, Role::Owner];

    /// Capabilities granted by this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Member => MEMBER_CAPABILITIES,
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Owner => OWNER_CAPABILITIES,
        }
    }

    /// Check whether this role grants a capability.
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Check if this role can manage members.
    ///
    /// This includes inviting, removing, and changing member roles.
    ///
    /// # Returns
    ///
    /// `true` for Admin and Owner roles
    pub fn can_manage_members(&self) -> bool {
        self.can(Capability::ManageMembers)
    }

    /// Check if this role can delete the organization.
    ///
    /// # Returns
    ///
    /// `true` only for Owner role
    pub fn can_delete_org(&self) -> bool {
        self.can(Capability::DeleteOrganization)
    }

    /// Check if this role can transfer ownership.
    ///
    /// # Returns
    ///
    /// `true` only for Owner role
    pub fn can_transfer_ownership(&self) -> bool {
        self.can(Capability::TransferOwnership)
    }

    /// Whether an invitation may propose this role. Ownership is never
    /// granted through an invitation.
    pub fn is_invitable(&self) -> bool {
        !matches!(self, Role::Owner)
    }

    /// Check whether a raw string names a valid role.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_rbac::Role;
    ///
    /// assert!(Role::is_valid("owner"));
    /// assert!(!Role::is_valid("superuser"));
    /// ```
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_some()
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(Role)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_rbac::Role;
    ///
    /// assert_eq!(Role::parse("admin"), Some(Role::Admin));
    /// assert_eq!(Role::parse("MEMBER"), Some(Role::Member));
    /// assert_eq!(Role::parse("viewer"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Get string representation of the role.
    ///
    /// This is also the value persisted by the stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Admin => "Admin",
            Self::Member => "Member",
        }
    }

    /// Sort key used for member listings: owners first, then admins, then members.
    pub fn listing_rank(&self) -> u8 {
        match self {
            Self::Owner => 1,
            Self::Admin => 2,
            Self::Member => 3,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseRoleError(s.to_string()))
    }
}
