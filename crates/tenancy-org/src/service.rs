//! Organization service
//!
//! Orchestrates the stores, the role policy and the session collaborator.
//! Every operation takes the authenticated [`Caller`] explicitly, resolves
//! the caller's membership, applies the role policy and only then touches
//! storage. Store errors are translated to [`OrgError`] before returning.
//!
//! Each call runs under the configured operation timeout. A timed-out call
//! is reported as an internal error; multi-row writes happen inside store
//! transactions, so cancellation leaves no partial state.

use chrono::Duration;
use std::future::Future;
use std::sync::Arc;
use tenancy_auth::{generate_token, Caller, Clock, SessionStore, SystemClock};
use tenancy_rbac::Role;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{OrgError, OrgResult, Resource, StoreError};
use crate::invitation::{
    default_invitation_ttl, normalize_email, Invitation, InvitationStatus, InvitationWithDetails,
    NewInvitation,
};
use crate::membership::{Member, MemberWithUser};
use crate::organization::{Organization, OrganizationWithRole};
use crate::slug::generate_slug;
use crate::store::{InvitationStore, MembershipStore};

/// Default bound on a single service operation.
pub const DEFAULT_OPERATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Tunables for [`OrganizationService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Lifetime of a new invitation
    pub invitation_ttl: Duration,

    /// Upper bound on any single operation, storage included
    pub operation_timeout: std::time::Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            invitation_ttl: default_invitation_ttl(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Membership and invitation operations for authenticated callers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tenancy_auth::{Caller, IdentityProvider, MemorySessionStore, User};
/// use tenancy_org::{MemoryStore, OrganizationService};
/// use tenancy_rbac::Role;
///
/// # async fn example() -> tenancy_org::OrgResult<()> {
/// let store = Arc::new(MemoryStore::new());
/// let service = OrganizationService::new(
///     store.clone(),
///     store.clone(),
///     Arc::new(MemorySessionStore::new()),
/// );
///
/// let user = store.upsert_user(User::new("u1@example.com", "U1")).await?;
/// let acme = service.create(&Caller::from_user(&user), "Acme").await?;
/// assert_eq!(acme.role, Role::Owner);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OrganizationService {
    memberships: Arc<dyn MembershipStore>,
    invitations: Arc<dyn InvitationStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl std::fmt::Debug for OrganizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OrganizationService {
    /// Create a service with the system clock and default configuration.
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        invitations: Arc<dyn InvitationStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            memberships,
            invitations,
            sessions,
            clock: Arc::new(SystemClock),
            config: ServiceConfig::default(),
        }
    }

    /// Replace the time source used for invitation expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the service configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the membership store is reachable.
    pub async fn ping(&self) -> OrgResult<()> {
        self.bounded("ping", async { Ok(self.memberships.ping().await?) })
            .await
    }

    // =====================================================================
    // Organizations
    // =====================================================================

    /// Create an organization owned by the caller.
    ///
    /// The slug is derived from the name and the caller ID; a collision is
    /// reported as [`OrgError::SlugExists`] and not retried.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn create(&self, caller: &Caller, name: &str) -> OrgResult<OrganizationWithRole> {
        self.bounded("create", async {
            let name = validate_name(name)?;
            let slug = generate_slug(name, &caller.user_id.to_string());
            let org = Organization::new(name, slug, caller.user_id);

            self.memberships.create_organization(&org).await?;

            info!(org_id = %org.id, slug = %org.slug, "Organization created");
            Ok(org.with_role(Role::Owner))
        })
        .await
    }

    /// Organizations the caller belongs to, ordered by name.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list(&self, caller: &Caller) -> OrgResult<Vec<OrganizationWithRole>> {
        self.bounded("list", async {
            Ok(self
                .memberships
                .list_user_organizations(caller.user_id)
                .await?)
        })
        .await
    }

    /// Fetch an organization the caller belongs to.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn get(&self, caller: &Caller, org_id: Uuid) -> OrgResult<OrganizationWithRole> {
        self.bounded("get", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            let org = self.memberships.get_organization(org_id).await?;
            Ok(org.with_role(member.role))
        })
        .await
    }

    /// Fetch an organization by slug. Membership is still required.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn get_by_slug(&self, caller: &Caller, slug: &str) -> OrgResult<OrganizationWithRole> {
        self.bounded("get_by_slug", async {
            let org = self.memberships.get_organization_by_slug(slug).await?;
            let member = self.require_member(org.id, caller.user_id).await?;
            Ok(org.with_role(member.role))
        })
        .await
    }

    /// Rename an organization. Requires the manage-members capability.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn update_name(
        &self,
        caller: &Caller,
        org_id: Uuid,
        name: &str,
    ) -> OrgResult<OrganizationWithRole> {
        self.bounded("update_name", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;
            let name = validate_name(name)?;

            let org = self.memberships.update_organization_name(org_id, name).await?;
            info!(org_id = %org_id, "Organization renamed");
            Ok(org.with_role(member.role))
        })
        .await
    }

    /// Delete an organization with its members and invitations. Owner only.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn delete(&self, caller: &Caller, org_id: Uuid) -> OrgResult<()> {
        self.bounded("delete", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(
                member.role.can_delete_org(),
                "only owners can delete organizations",
            )?;

            self.memberships.delete_organization(org_id).await?;
            info!(org_id = %org_id, "Organization deleted");
            Ok(())
        })
        .await
    }

    // =====================================================================
    // Members
    // =====================================================================

    /// Roster of an organization the caller belongs to.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list_members(&self, caller: &Caller, org_id: Uuid) -> OrgResult<Vec<MemberWithUser>> {
        self.bounded("list_members", async {
            self.require_member(org_id, caller.user_id).await?;
            Ok(self.memberships.list_members(org_id).await?)
        })
        .await
    }

    /// Change a member's role.
    ///
    /// Requires manage-members; granting or revoking owner requires the
    /// caller to be an owner; the last owner cannot be demoted.
    ///
    /// `role` is validated only after the caller's membership and
    /// capability, so non-members learn nothing from a malformed request.
    #[instrument(skip(self, caller, role), fields(user_id = %caller.user_id))]
    pub async fn update_member_role(
        &self,
        caller: &Caller,
        org_id: Uuid,
        target_user_id: Uuid,
        role: impl AsRef<str>,
    ) -> OrgResult<Member> {
        self.bounded("update_member_role", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;
            let role =
                Role::parse(role.as_ref()).ok_or_else(|| OrgError::validation("invalid role"))?;

            let target = self.require_target(org_id, target_user_id).await?;
            if (role == Role::Owner || target.is_owner()) && member.role != Role::Owner {
                return Err(OrgError::forbidden("only owners can change owner roles"));
            }
            if target.is_owner() && role != Role::Owner {
                self.ensure_not_last_owner(org_id, "cannot demote the last owner")
                    .await?;
            }

            let updated = self
                .memberships
                .update_member_role(org_id, target_user_id, role)
                .await
                .map_err(|e| owner_floor(e, "cannot demote the last owner"))?;

            info!(
                org_id = %org_id,
                target_user_id = %target_user_id,
                from = %target.role,
                to = %role,
                "Member role updated"
            );
            Ok(updated)
        })
        .await
    }

    /// Remove a member.
    ///
    /// Requires manage-members; admins may not remove owners; the last owner
    /// cannot be removed.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn remove_member(
        &self,
        caller: &Caller,
        org_id: Uuid,
        target_user_id: Uuid,
    ) -> OrgResult<()> {
        self.bounded("remove_member", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;

            let target = self.require_target(org_id, target_user_id).await?;
            if target.is_owner() {
                require(member.role == Role::Owner, "admins cannot remove owners")?;
                self.ensure_not_last_owner(org_id, "cannot remove the last owner")
                    .await?;
            }

            self.memberships
                .remove_member(org_id, target_user_id)
                .await
                .map_err(|e| owner_floor(e, "cannot remove the last owner"))?;

            info!(org_id = %org_id, target_user_id = %target_user_id, "Member removed");
            Ok(())
        })
        .await
    }

    /// Leave an organization. The last owner must transfer ownership or
    /// delete the organization instead.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn leave(&self, caller: &Caller, org_id: Uuid) -> OrgResult<()> {
        const LAST_OWNER: &str =
            "cannot leave as the last owner - transfer ownership or delete the organization";

        self.bounded("leave", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            if member.is_owner() {
                self.ensure_not_last_owner(org_id, LAST_OWNER).await?;
            }

            self.memberships
                .remove_member(org_id, caller.user_id)
                .await
                .map_err(|e| owner_floor(e, LAST_OWNER))?;

            info!(org_id = %org_id, "Member left organization");
            Ok(())
        })
        .await
    }

    /// Hand ownership to another member: the caller becomes admin and the
    /// target becomes owner, atomically.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn transfer_ownership(
        &self,
        caller: &Caller,
        org_id: Uuid,
        new_owner_id: Uuid,
    ) -> OrgResult<()> {
        self.bounded("transfer_ownership", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(
                member.role.can_transfer_ownership(),
                "only owners can transfer ownership",
            )?;
            if new_owner_id == caller.user_id {
                return Err(OrgError::validation("cannot transfer ownership to yourself"));
            }

            match self.memberships.get_member(org_id, new_owner_id).await {
                Ok(_) => {}
                Err(StoreError::MemberNotFound) => {
                    return Err(OrgError::validation(
                        "new owner must be a member of the organization",
                    ))
                }
                Err(e) => return Err(e.into()),
            }

            self.memberships
                .transfer_ownership(org_id, caller.user_id, new_owner_id)
                .await?;

            info!(org_id = %org_id, new_owner_id = %new_owner_id, "Ownership transferred");
            Ok(())
        })
        .await
    }

    // =====================================================================
    // Invitations
    // =====================================================================

    /// Invite an email address to the organization with a non-owner role.
    ///
    /// Membership and capability are checked before the email and role.
    #[instrument(skip(self, caller, email, role), fields(user_id = %caller.user_id))]
    pub async fn invite(
        &self,
        caller: &Caller,
        org_id: Uuid,
        email: &str,
        role: impl AsRef<str>,
    ) -> OrgResult<Invitation> {
        self.bounded("invite", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;

            let email = normalize_email(email);
            if email.is_empty() {
                return Err(OrgError::validation("email is required"));
            }
            let role = Role::parse(role.as_ref())
                .filter(Role::is_invitable)
                .ok_or_else(|| OrgError::validation("invalid role - must be admin or member"))?;
            if !email.contains('@') {
                return Err(OrgError::validation("invalid email address"));
            }
            if self.memberships.is_member_by_email(org_id, &email).await? {
                return Err(OrgError::AlreadyMember);
            }

            let now = self.clock.now();
            let expires_at = NewInvitation::expiry_from(now, self.config.invitation_ttl)
                .ok_or_else(|| {
                    error!(ttl = %self.config.invitation_ttl, "Invitation expiry out of range");
                    OrgError::internal()
                })?;
            let invitation = self
                .invitations
                .create_invitation(NewInvitation {
                    organization_id: org_id,
                    email,
                    role,
                    token: generate_token(),
                    invited_by: caller.user_id,
                    expires_at,
                })
                .await?;

            info!(
                org_id = %org_id,
                invitation_id = %invitation.id,
                role = %role,
                "Invitation created"
            );
            Ok(invitation)
        })
        .await
    }

    /// Invitations of an organization, newest first.
    ///
    /// Every status is returned unless `status` narrows it; expiry is not
    /// considered.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list_invitations(
        &self,
        caller: &Caller,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> OrgResult<Vec<Invitation>> {
        self.bounded("list_invitations", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;
            Ok(self.invitations.list_invitations(org_id, status).await?)
        })
        .await
    }

    /// Delete an invitation of this organization.
    ///
    /// An invitation belonging to another organization is reported as not
    /// found.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn cancel_invitation(
        &self,
        caller: &Caller,
        org_id: Uuid,
        invitation_id: Uuid,
    ) -> OrgResult<()> {
        self.bounded("cancel_invitation", async {
            let member = self.require_member(org_id, caller.user_id).await?;
            require(member.role.can_manage_members(), "insufficient permissions")?;

            let invitation = self.invitations.get_invitation(invitation_id).await?;
            if invitation.organization_id != org_id {
                return Err(OrgError::NotFound(Resource::Invitation));
            }

            self.invitations.delete_invitation(invitation_id).await?;
            info!(org_id = %org_id, invitation_id = %invitation_id, "Invitation cancelled");
            Ok(())
        })
        .await
    }

    /// Pending, unexpired invitations addressed to the caller's email,
    /// newest first.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn my_invitations(&self, caller: &Caller) -> OrgResult<Vec<InvitationWithDetails>> {
        self.bounded("my_invitations", async {
            let email = normalize_email(&caller.email);
            Ok(self
                .invitations
                .list_pending_for_email(&email, self.clock.now())
                .await?)
        })
        .await
    }

    /// Accept an invitation and join its organization.
    ///
    /// Order of checks: addressee, expiry (marks the invitation expired),
    /// pending status, then membership. If the caller is already a member
    /// the invitation is still marked accepted and
    /// [`OrgError::AlreadyMember`] is returned.
    #[instrument(skip(self, caller, token), fields(user_id = %caller.user_id))]
    pub async fn accept_invitation(
        &self,
        caller: &Caller,
        token: &str,
    ) -> OrgResult<OrganizationWithRole> {
        self.bounded("accept_invitation", async {
            let invitation = self.addressed_invitation(caller, token).await?;

            if invitation.is_expired_at(self.clock.now()) {
                self.mark(&invitation, InvitationStatus::Expired).await;
                return Err(OrgError::InviteExpired);
            }
            if !invitation.is_pending() {
                return Err(OrgError::InviteNotPending);
            }

            let member = Member::new(invitation.organization_id, caller.user_id, invitation.role);
            match self.memberships.add_member(&member).await {
                Ok(()) => {}
                Err(StoreError::AlreadyMember) => {
                    self.mark(&invitation, InvitationStatus::Accepted).await;
                    return Err(OrgError::AlreadyMember);
                }
                Err(e) => return Err(e.into()),
            }

            match self
                .invitations
                .transition_invitation(invitation.id, InvitationStatus::Accepted)
                .await
            {
                Ok(_) => {}
                // Answered concurrently; the membership row stands.
                Err(StoreError::InvitationNotPending) => warn!(
                    invitation_id = %invitation.id,
                    "Invitation changed state during accept"
                ),
                Err(e) => return Err(e.into()),
            }

            let org = self
                .memberships
                .get_organization(invitation.organization_id)
                .await?;

            info!(
                org_id = %org.id,
                invitation_id = %invitation.id,
                role = %invitation.role,
                "Invitation accepted"
            );
            Ok(org.with_role(invitation.role))
        })
        .await
    }

    /// Decline a pending invitation addressed to the caller.
    #[instrument(skip(self, caller, token), fields(user_id = %caller.user_id))]
    pub async fn decline_invitation(&self, caller: &Caller, token: &str) -> OrgResult<()> {
        self.bounded("decline_invitation", async {
            let invitation = self.addressed_invitation(caller, token).await?;
            if !invitation.is_pending() {
                return Err(OrgError::InviteNotPending);
            }

            self.invitations
                .transition_invitation(invitation.id, InvitationStatus::Declined)
                .await?;

            info!(invitation_id = %invitation.id, "Invitation declined");
            Ok(())
        })
        .await
    }

    // =====================================================================
    // Sessions
    // =====================================================================

    /// Record `org_id` as the active organization on the caller's session.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn set_active_org(&self, caller: &Caller, org_id: Uuid) -> OrgResult<()> {
        self.bounded("set_active_org", async {
            let session_id = caller
                .session_id
                .as_deref()
                .ok_or_else(|| OrgError::forbidden("no active session"))?;
            self.require_member(org_id, caller.user_id).await?;

            self.sessions.set_active_org(session_id, org_id).await?;
            info!(org_id = %org_id, "Active organization set");
            Ok(())
        })
        .await
    }

    // =====================================================================
    // Helpers
    // =====================================================================

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> OrgResult<T>
    where
        F: Future<Output = OrgResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    operation,
                    timeout_ms = self.config.operation_timeout.as_millis() as u64,
                    "Operation timed out"
                );
                Err(OrgError::internal())
            }
        }
    }

    /// The caller's membership, or [`OrgError::NotAMember`].
    async fn require_member(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Member> {
        Ok(self.memberships.get_member(org_id, user_id).await?)
    }

    /// A target member of a management operation; absence is not found.
    async fn require_target(&self, org_id: Uuid, user_id: Uuid) -> OrgResult<Member> {
        match self.memberships.get_member(org_id, user_id).await {
            Ok(member) => Ok(member),
            Err(StoreError::MemberNotFound) => Err(OrgError::NotFound(Resource::Member)),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_not_last_owner(&self, org_id: Uuid, message: &str) -> OrgResult<()> {
        if self.memberships.count_owners(org_id).await? <= 1 {
            warn!(org_id = %org_id, "Rejected change that would remove the last owner");
            return Err(OrgError::LastOwner(message.to_string()));
        }
        Ok(())
    }

    /// Resolve an invitation by token and check it is addressed to the
    /// caller.
    async fn addressed_invitation(&self, caller: &Caller, token: &str) -> OrgResult<Invitation> {
        let details = self.invitations.get_invitation_by_token(token).await?;
        if details.invitation.email != normalize_email(&caller.email) {
            return Err(OrgError::forbidden("invitation is not for this user"));
        }
        Ok(details.invitation)
    }

    /// Best-effort status write on a path that is already failing.
    async fn mark(&self, invitation: &Invitation, status: InvitationStatus) {
        match self
            .invitations
            .transition_invitation(invitation.id, status)
            .await
        {
            Ok(_) | Err(StoreError::InvitationNotPending) => {}
            Err(e) => warn!(
                invitation_id = %invitation.id,
                status = %status,
                error = %e,
                "Failed to update invitation status"
            ),
        }
    }
}

fn validate_name(name: &str) -> OrgResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OrgError::validation("name is required"));
    }
    Ok(name)
}

fn require(allowed: bool, message: &str) -> OrgResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(OrgError::forbidden(message))
    }
}

/// Store-level owner-floor refusals carry the operation's message.
fn owner_floor(err: StoreError, message: &str) -> OrgError {
    match err {
        StoreError::LastOwner => {
            warn!("Owner floor enforced by store");
            OrgError::LastOwner(message.to_string())
        }
        other => other.into(),
    }
}
