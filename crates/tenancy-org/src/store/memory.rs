//! In-memory store backend
//!
//! All tables live behind one `RwLock`, so every trait method is a single
//! critical section and the owner-floor checks see the same state as the
//! write that follows them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tenancy_auth::{AuthError, AuthResult, IdentityProvider, User};
use tenancy_rbac::Role;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{InvitationStore, MembershipStore};
use crate::error::{StoreError, StoreResult};
use crate::invitation::{Invitation, InvitationStatus, InvitationWithDetails, NewInvitation};
use crate::membership::{sort_roster, Member, MemberWithUser};
use crate::organization::{Organization, OrganizationWithRole};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    /// Keyed by (organization, user)
    members: HashMap<(Uuid, Uuid), Member>,
    invitations: HashMap<Uuid, Invitation>,
}

impl Tables {
    fn owner_count(&self, org_id: Uuid) -> u64 {
        self.members
            .values()
            .filter(|m| m.organization_id == org_id && m.role == Role::Owner)
            .count() as u64
    }

    fn details(&self, invitation: &Invitation) -> InvitationWithDetails {
        InvitationWithDetails {
            organization_name: self
                .organizations
                .get(&invitation.organization_id)
                .map(|o| o.name.clone())
                .unwrap_or_default(),
            invited_by_name: self
                .users
                .get(&invitation.invited_by)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            invitation: invitation.clone(),
        }
    }
}

/// In-memory implementation of the membership, invitation and identity
/// stores.
///
/// Cloning shares the underlying tables.
///
/// # Examples
///
/// ```
/// use tenancy_org::{MembershipStore, MemoryStore, Organization};
/// use uuid::Uuid;
///
/// # async fn example() -> tenancy_org::StoreResult<()> {
/// let store = MemoryStore::new();
/// let org = Organization::new("Acme", "acme-12345678", Uuid::now_v7());
/// let owner = store.create_organization(&org).await?;
/// assert!(owner.is_owner());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryStore {
    async fn get_user(&self, id: Uuid) -> AuthResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        let email = email.to_lowercase();
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn upsert_user(&self, user: User) -> AuthResult<User> {
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        let existing = tables
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned();

        let stored = match existing {
            Some(mut current) => {
                current.name = user.name;
                current.picture = user.picture;
                current.updated_at = Utc::now();
                current
            }
            None => user,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn create_organization(&self, org: &Organization) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        if tables.organizations.values().any(|o| o.slug == org.slug) {
            return Err(StoreError::SlugExists);
        }

        let owner = Member::new(org.id, org.created_by, Role::Owner);
        tables.organizations.insert(org.id, org.clone());
        tables.members.insert((org.id, org.created_by), owner.clone());
        Ok(owner)
    }

    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Organization> {
        self.tables
            .read()
            .await
            .organizations
            .get(&org_id)
            .cloned()
            .ok_or(StoreError::OrganizationNotFound)
    }

    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Organization> {
        self.tables
            .read()
            .await
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned()
            .ok_or(StoreError::OrganizationNotFound)
    }

    async fn update_organization_name(
        &self,
        org_id: Uuid,
        name: &str,
    ) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        let org = tables
            .organizations
            .get_mut(&org_id)
            .ok_or(StoreError::OrganizationNotFound)?;
        org.name = name.to_string();
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn delete_organization(&self, org_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.organizations.remove(&org_id).is_none() {
            return Err(StoreError::OrganizationNotFound);
        }
        tables.members.retain(|(org, _), _| *org != org_id);
        tables.invitations.retain(|_, inv| inv.organization_id != org_id);
        Ok(())
    }

    async fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationWithRole>> {
        let tables = self.tables.read().await;
        let mut orgs: Vec<OrganizationWithRole> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                tables
                    .organizations
                    .get(&m.organization_id)
                    .map(|o| o.clone().with_role(m.role))
            })
            .collect();
        orgs.sort_by(|a, b| a.organization.name.cmp(&b.organization.name));
        Ok(orgs)
    }

    async fn add_member(&self, member: &Member) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&member.organization_id) {
            return Err(StoreError::OrganizationNotFound);
        }
        let key = (member.organization_id, member.user_id);
        if tables.members.contains_key(&key) {
            return Err(StoreError::AlreadyMember);
        }
        tables.members.insert(key, member.clone());
        Ok(())
    }

    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Member> {
        self.tables
            .read()
            .await
            .members
            .get(&(org_id, user_id))
            .cloned()
            .ok_or(StoreError::MemberNotFound)
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithUser>> {
        let tables = self.tables.read().await;
        let mut roster: Vec<MemberWithUser> = tables
            .members
            .values()
            .filter(|m| m.organization_id == org_id)
            .filter_map(|m| {
                // Inner join: rows whose identity is gone are not listed.
                tables.users.get(&m.user_id).map(|u| MemberWithUser {
                    id: m.id,
                    organization_id: m.organization_id,
                    user_id: m.user_id,
                    role: m.role,
                    email: u.email.clone(),
                    name: u.name.clone(),
                    picture: u.picture.clone(),
                    created_at: m.created_at,
                    updated_at: m.updated_at,
                })
            })
            .collect();
        sort_roster(&mut roster);
        Ok(roster)
    }

    async fn update_member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        let owners = tables.owner_count(org_id);
        let member = tables
            .members
            .get_mut(&(org_id, user_id))
            .ok_or(StoreError::MemberNotFound)?;

        if member.role == Role::Owner && role != Role::Owner && owners <= 1 {
            return Err(StoreError::LastOwner);
        }
        member.role = role;
        member.updated_at = Utc::now();
        Ok(member.clone())
    }

    async fn remove_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let owners = tables.owner_count(org_id);
        let member = tables
            .members
            .get(&(org_id, user_id))
            .ok_or(StoreError::MemberNotFound)?;

        if member.role == Role::Owner && owners <= 1 {
            return Err(StoreError::LastOwner);
        }
        tables.members.remove(&(org_id, user_id));
        Ok(())
    }

    async fn count_owners(&self, org_id: Uuid) -> StoreResult<u64> {
        Ok(self.tables.read().await.owner_count(org_id))
    }

    async fn transfer_ownership(&self, org_id: Uuid, from: Uuid, to: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.members.contains_key(&(org_id, from))
            || !tables.members.contains_key(&(org_id, to))
        {
            return Err(StoreError::MemberNotFound);
        }

        let now = Utc::now();
        if let Some(current) = tables.members.get_mut(&(org_id, from)) {
            current.role = Role::Admin;
            current.updated_at = now;
        }
        if let Some(target) = tables.members.get_mut(&(org_id, to)) {
            target.role = Role::Owner;
            target.updated_at = now;
        }
        Ok(())
    }

    async fn is_member_by_email(&self, org_id: Uuid, email: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let email = email.to_lowercase();
        Ok(tables
            .members
            .values()
            .filter(|m| m.organization_id == org_id)
            .any(|m| {
                tables
                    .users
                    .get(&m.user_id)
                    .is_some_and(|u| u.email.to_lowercase() == email)
            }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn create_invitation(&self, new: NewInvitation) -> StoreResult<Invitation> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&new.organization_id) {
            return Err(StoreError::OrganizationNotFound);
        }
        if tables.invitations.values().any(|inv| {
            inv.organization_id == new.organization_id && inv.email == new.email && inv.is_pending()
        }) {
            return Err(StoreError::InviteExists);
        }
        if tables.invitations.values().any(|inv| inv.token == new.token) {
            return Err(StoreError::Backend(
                "duplicate invitation token".to_string(),
            ));
        }

        let invitation = Invitation::from_new(new, Utc::now());
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation(&self, invitation_id: Uuid) -> StoreResult<Invitation> {
        self.tables
            .read()
            .await
            .invitations
            .get(&invitation_id)
            .cloned()
            .ok_or(StoreError::InvitationNotFound)
    }

    async fn get_invitation_by_token(&self, token: &str) -> StoreResult<InvitationWithDetails> {
        let tables = self.tables.read().await;
        tables
            .invitations
            .values()
            .find(|inv| inv.token == token)
            .map(|inv| tables.details(inv))
            .ok_or(StoreError::InvitationNotFound)
    }

    async fn list_invitations(
        &self,
        org_id: Uuid,
        status: Option<InvitationStatus>,
    ) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.read().await;
        let mut invitations: Vec<Invitation> = tables
            .invitations
            .values()
            .filter(|inv| inv.organization_id == org_id)
            .filter(|inv| status.map_or(true, |s| inv.status == s))
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invitations)
    }

    async fn list_pending_for_email(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InvitationWithDetails>> {
        let tables = self.tables.read().await;
        let mut invitations: Vec<&Invitation> = tables
            .invitations
            .values()
            .filter(|inv| inv.email == email && inv.is_pending() && inv.expires_at > now)
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invitations.into_iter().map(|inv| tables.details(inv)).collect())
    }

    async fn transition_invitation(
        &self,
        invitation_id: Uuid,
        status: InvitationStatus,
    ) -> StoreResult<Invitation> {
        let mut tables = self.tables.write().await;
        let invitation = tables
            .invitations
            .get_mut(&invitation_id)
            .ok_or(StoreError::InvitationNotFound)?;

        if !invitation.status.can_transition_to(status) {
            return Err(StoreError::InvitationNotPending);
        }
        invitation.status = status;
        invitation.updated_at = Utc::now();
        Ok(invitation.clone())
    }

    async fn delete_invitation(&self, invitation_id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .invitations
            .remove(&invitation_id)
            .map(|_| ())
            .ok_or(StoreError::InvitationNotFound)
    }
}
