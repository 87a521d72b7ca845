//! # Capabilities
//!
//! Named permissions derived from an organization role.
//! Capabilities are never stored; they are computed from the role table
//! in [`crate::roles`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations gated by role inside an organization.
///
/// - **ManageMembers**: invite, remove, change roles, rename the organization
/// - **DeleteOrganization**: delete the organization and everything it owns
/// - **TransferOwnership**: hand the owner role to another member
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Manage the member roster and pending invitations.
    ManageMembers,

    /// Delete the organization.
    DeleteOrganization,

    /// Transfer ownership to another member.
    TransferOwnership,
}

impl Capability {
    /// Get the string representation of the capability.
    ///
    /// # Returns
    ///
    /// The kebab-case identifier, identical to the serde form,
    /// e.g. `"manage-members"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageMembers => "manage-members",
            Capability::DeleteOrganization => "delete-organization",
            Capability::TransferOwnership => "transfer-ownership",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
