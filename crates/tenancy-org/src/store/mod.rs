//! Persistence interfaces for organizations, members and invitations
//!
//! The service talks to storage only through [`MembershipStore`] and
//! [`InvitationStore`]. Two backends implement both traits (and the
//! [`IdentityProvider`](tenancy_auth::IdentityProvider) users table):
//!
//! - [`MemoryStore`]: single write lock, for tests and single-process use
//! - `SqliteStore` (`sqlite` feature): sqlx over SQLite with transactions
//!
//! # Atomicity
//!
//! Every method is one atomic unit. Multi-row writes
//! ([`MembershipStore::create_organization`],
//! [`MembershipStore::transfer_ownership`]) commit together or not at all.
//! Role changes and removals re-check the owner floor inside the same unit
//! as the write, so concurrent demotions cannot leave an organization
//! without an owner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenancy_rbac::Role;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::invitation::{Invitation, InvitationStatus, InvitationWithDetails, NewInvitation};
use crate::membership::{Member, MemberWithUser};
use crate::organization::{Organization, OrganizationWithRole};

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Organization and roster persistence.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert the organization and an owner row for `org.created_by`.
    ///
    /// Both rows are written or neither is. Fails with
    /// [`StoreError::SlugExists`](crate::StoreError::SlugExists) on a slug
    /// collision.
    async fn create_organization(&self, org: &Organization) -> StoreResult<Member>;

    /// Fetch an organization by ID.
    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Organization>;

    /// Fetch an organization by slug.
    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Organization>;

    /// Rename an organization, returning the updated row.
    async fn update_organization_name(&self, org_id: Uuid, name: &str)
        -> StoreResult<Organization>;

    /// Delete an organization with all of its members and invitations.
    async fn delete_organization(&self, org_id: Uuid) -> StoreResult<()>;

    /// Organizations the user belongs to, with their role, ordered by name.
    async fn list_user_organizations(&self, user_id: Uuid)
        -> StoreResult<Vec<OrganizationWithRole>>;

    /// Insert a member row. Fails with `AlreadyMember` on a duplicate pair.
    async fn add_member(&self, member: &Member) -> StoreResult<()>;

    /// Fetch one member row, or `MemberNotFound`.
    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Member>;

    /// Roster joined with identity fields, owners first, then admins, then
    /// members, ties by name.
    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithUser>>;

    /// Change a member's role.
    ///
    /// Fails with `MemberNotFound` when no row matches and with `LastOwner`
    /// when the target is the only owner and `role` is not owner.
    async fn update_member_role(&self, org_id: Uuid, user_id: Uuid, role: Role)
        -> StoreResult<Member>;

    /// Delete a member row, refusing to delete the only owner.
    async fn remove_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    /// Number of owners in the organization.
    async fn count_owners(&self, org_id: Uuid) -> StoreResult<u64>;

    /// Demote `from` to admin and promote `to` to owner as one unit.
    ///
    /// If `to` has no member row nothing changes and `MemberNotFound` is
    /// returned.
    async fn transfer_ownership(&self, org_id: Uuid, from: Uuid, to: Uuid) -> StoreResult<()>;

    /// Whether a user with this (normalized) email is a member.
    async fn is_member_by_email(&self, org_id: Uuid, email: &str) -> StoreResult<bool>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Invitation persistence.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Insert a pending invitation.
    ///
    /// Fails with `InviteExists` if a pending invitation already exists for
    /// the (organization, email) pair.
    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation>;

    /// Fetch an invitation by ID.
    async fn get_invitation(&self, invitation_id: Uuid) -> StoreResult<Invitation>;

    /// Fetch an invitation by token with organization and inviter names.
    async fn get_invitation_by_token(&self, token: &str) -> StoreResult<InvitationWithDetails>;

    /// Invitations of an organization, newest first, optionally filtered
    /// by status. Expiry is not considered.
    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> StoreResult<Vec<Invitation>>;

    /// Pending invitations addressed to `email` that expire after `now`,
    /// newest first.
    async fn list_pending_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithDetails>>;

    /// Move a pending invitation to a terminal status.
    ///
    /// The write only applies while the row is still pending; otherwise
    /// `InvitationNotPending` is returned.
    async fn transition_invitation(
        &self,
        invitation_id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Invitation>;

    /// Delete an invitation row.
    async fn delete_invitation(&self, invitation_id: Uuid) -> StoreResult<()>;
}
