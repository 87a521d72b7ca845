//! Organization service scenarios over the in-memory store.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tenancy_auth::{Caller, IdentityProvider, ManualClock, MemorySessionStore, SessionStore, User};
use tenancy_org::{
    InvitationStatus, InvitationStore, Member, MemberWithUser, MembershipStore, MemoryStore,
    OrgError, Organization, OrganizationService, OrganizationWithRole, Resource, ServiceConfig,
    StoreResult,
};
use tenancy_rbac::Role;
use tokio::sync::Barrier;
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryStore>,
    sessions: Arc<MemorySessionStore>,
    clock: Arc<ManualClock>,
    service: OrganizationService,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let service = OrganizationService::new(store.clone(), store.clone(), sessions.clone())
            .with_clock(clock.clone());
        Self {
            store,
            sessions,
            clock,
            service,
        }
    }

    async fn user(&self, email: &str, name: &str) -> Caller {
        let user = self.store.upsert_user(User::new(email, name)).await.unwrap();
        Caller::from_user(&user)
    }

    async fn owners(&self, org_id: Uuid) -> u64 {
        self.store.count_owners(org_id).await.unwrap()
    }

    /// Invite `invitee` as `role` and have them accept.
    async fn join(&self, inviter: &Caller, org_id: Uuid, invitee: &Caller, role: Role) {
        let invitation = self
            .service
            .invite(inviter, org_id, &invitee.email, role)
            .await
            .unwrap();
        self.service
            .accept_invitation(invitee, &invitation.token)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_acme_scenario() {
    let h = Harness::new();
    let u1 = h.user("u1@x.com", "U1").await;
    let u2 = h.user("b@x.com", "U2").await;

    let acme = h.service.create(&u1, "Acme").await.unwrap();
    let org_id = acme.organization.id;
    assert_eq!(acme.role, Role::Owner);
    assert_eq!(h.service.list_members(&u1, org_id).await.unwrap().len(), 1);

    let invitation = h
        .service
        .invite(&u1, org_id, "b@x.com", Role::Member)
        .await
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.expires_at - h.clock_now(), Duration::days(7));

    let joined = h
        .service
        .accept_invitation(&u2, &invitation.token)
        .await
        .unwrap();
    assert_eq!(joined.role, Role::Member);
    assert_eq!(joined.organization.id, org_id);

    let members = h.service.list_members(&u1, org_id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].user_id, u2.user_id);
    assert_eq!(members[1].role, Role::Member);
    assert_eq!(
        h.store.get_invitation(invitation.id).await.unwrap().status,
        InvitationStatus::Accepted
    );

    // U1 is still the only owner.
    assert!(matches!(
        h.service.leave(&u1, org_id).await,
        Err(OrgError::LastOwner(_))
    ));
    assert_eq!(h.owners(org_id).await, 1);

    h.service
        .transfer_ownership(&u1, org_id, u2.user_id)
        .await
        .unwrap();
    h.service.leave(&u1, org_id).await.unwrap();

    assert_eq!(h.owners(org_id).await, 1);
    let remaining = h.service.list_members(&u2, org_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].role, Role::Owner);
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use tenancy_auth::Clock;
        self.clock.now()
    }
}

#[tokio::test]
async fn test_create_validates_name_and_reports_slug_collision() {
    let h = Harness::new();
    let u1 = h.user("u1@x.com", "U1").await;

    assert!(matches!(
        h.service.create(&u1, "   ").await,
        Err(OrgError::Validation(_))
    ));

    let first = h.service.create(&u1, "My Team!!").await.unwrap();
    let expected_suffix = &u1.user_id.to_string()[..8];
    assert_eq!(
        first.organization.slug,
        format!("my-team-{expected_suffix}")
    );

    // Same name, same creator: same slug, no auto-suffix retry.
    assert_eq!(
        h.service.create(&u1, "my team").await.unwrap_err(),
        OrgError::SlugExists
    );
    assert_eq!(h.service.list(&u1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_member_is_rejected() {
    let h = Harness::new();
    let u1 = h.user("u1@x.com", "U1").await;
    let outsider = h.user("out@x.com", "Out").await;
    let org_id = h.service.create(&u1, "Acme").await.unwrap().organization.id;

    assert_eq!(
        h.service.get(&outsider, org_id).await.unwrap_err(),
        OrgError::NotAMember
    );
    assert_eq!(
        h.service.list_members(&outsider, org_id).await.unwrap_err(),
        OrgError::NotAMember
    );
    let slug = h.service.get(&u1, org_id).await.unwrap().organization.slug;
    assert_eq!(
        h.service.get_by_slug(&outsider, &slug).await.unwrap_err(),
        OrgError::NotAMember
    );
    assert_eq!(
        h.service.get_by_slug(&u1, &slug).await.unwrap().role,
        Role::Owner
    );
}

#[tokio::test]
async fn test_capabilities_gate_mutations() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let admin = h.user("admin@x.com", "Admin").await;
    let member = h.user("member@x.com", "Member").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    h.join(&owner, org_id, &admin, Role::Admin).await;
    h.join(&owner, org_id, &member, Role::Member).await;

    // Members cannot manage anything.
    assert!(matches!(
        h.service.update_name(&member, org_id, "New").await,
        Err(OrgError::Forbidden(_))
    ));
    assert!(matches!(
        h.service.invite(&member, org_id, "c@x.com", Role::Member).await,
        Err(OrgError::Forbidden(_))
    ));

    // Admins can rename but not delete or transfer.
    let renamed = h.service.update_name(&admin, org_id, "Acme Inc").await.unwrap();
    assert_eq!(renamed.organization.name, "Acme Inc");
    assert_eq!(renamed.role, Role::Admin);
    assert!(matches!(
        h.service.delete(&admin, org_id).await,
        Err(OrgError::Forbidden(_))
    ));
    assert!(matches!(
        h.service.transfer_ownership(&admin, org_id, member.user_id).await,
        Err(OrgError::Forbidden(_))
    ));

    // Only owners may grant or revoke ownership.
    assert!(matches!(
        h.service
            .update_member_role(&admin, org_id, member.user_id, Role::Owner)
            .await,
        Err(OrgError::Forbidden(_))
    ));
    let promoted = h
        .service
        .update_member_role(&admin, org_id, member.user_id, Role::Admin)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);

    h.service.delete(&owner, org_id).await.unwrap();
    assert_eq!(
        h.service.get(&owner, org_id).await.unwrap_err(),
        OrgError::NotAMember
    );
    assert!(h.store.list_invitations(org_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_floor_on_demotion_and_removal() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let second = h.user("second@x.com", "Second").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    assert!(matches!(
        h.service
            .update_member_role(&owner, org_id, owner.user_id, Role::Admin)
            .await,
        Err(OrgError::LastOwner(_))
    ));
    assert!(matches!(
        h.service.remove_member(&owner, org_id, owner.user_id).await,
        Err(OrgError::LastOwner(_))
    ));
    assert_eq!(h.owners(org_id).await, 1);

    // With a second owner, one of them may step down.
    h.join(&owner, org_id, &second, Role::Admin).await;
    h.service
        .update_member_role(&owner, org_id, second.user_id, Role::Owner)
        .await
        .unwrap();
    assert_eq!(h.owners(org_id).await, 2);

    h.service
        .update_member_role(&second, org_id, owner.user_id, Role::Member)
        .await
        .unwrap();
    assert_eq!(h.owners(org_id).await, 1);
    assert!(matches!(
        h.service.leave(&second, org_id).await,
        Err(OrgError::LastOwner(_))
    ));
}

#[tokio::test]
async fn test_concurrent_demotions_keep_one_owner() {
    let h = Harness::new();
    let a = h.user("a@x.com", "A").await;
    let b = h.user("b@x.com", "B").await;
    let org_id = h.service.create(&a, "Acme").await.unwrap().organization.id;
    h.join(&a, org_id, &b, Role::Admin).await;
    h.service
        .update_member_role(&a, org_id, b.user_id, Role::Owner)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        h.service.update_member_role(&a, org_id, a.user_id, Role::Admin),
        h.service.update_member_role(&b, org_id, b.user_id, Role::Admin),
    );

    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    assert_eq!(h.owners(org_id).await, 1);
}

/// Holds every `count_owners` caller until two have arrived, so both see the
/// same owner count before either writes.
struct LockstepOwnerCount {
    inner: Arc<MemoryStore>,
    gate: Barrier,
}

#[async_trait]
impl MembershipStore for LockstepOwnerCount {
    async fn create_organization(&self, org: &Organization) -> StoreResult<Member> {
        self.inner.create_organization(org).await
    }

    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Organization> {
        self.inner.get_organization(org_id).await
    }

    async fn get_organization_by_slug(&self, slug: &str) -> StoreResult<Organization> {
        self.inner.get_organization_by_slug(slug).await
    }

    async fn update_organization_name(
        &self,
        org_id: Uuid,
        name: &str,
    ) -> StoreResult<Organization> {
        self.inner.update_organization_name(org_id, name).await
    }

    async fn delete_organization(&self, org_id: Uuid) -> StoreResult<()> {
        self.inner.delete_organization(org_id).await
    }

    async fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> StoreResult<Vec<OrganizationWithRole>> {
        self.inner.list_user_organizations(user_id).await
    }

    async fn add_member(&self, member: &Member) -> StoreResult<()> {
        self.inner.add_member(member).await
    }

    async fn get_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Member> {
        self.inner.get_member(org_id, user_id).await
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithUser>> {
        self.inner.list_members(org_id).await
    }

    async fn update_member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> StoreResult<Member> {
        self.inner.update_member_role(org_id, user_id, role).await
    }

    async fn remove_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.inner.remove_member(org_id, user_id).await
    }

    async fn count_owners(&self, org_id: Uuid) -> StoreResult<u64> {
        let owners = self.inner.count_owners(org_id).await;
        self.gate.wait().await;
        owners
    }

    async fn transfer_ownership(&self, org_id: Uuid, from: Uuid, to: Uuid) -> StoreResult<()> {
        self.inner.transfer_ownership(org_id, from, to).await
    }

    async fn is_member_by_email(&self, org_id: Uuid, email: &str) -> StoreResult<bool> {
        self.inner.is_member_by_email(org_id, email).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_store_refuses_second_demotion_after_stale_count() {
    let h = Harness::new();
    let a = h.user("a@x.com", "A").await;
    let b = h.user("b@x.com", "B").await;
    let org_id = h.service.create(&a, "Acme").await.unwrap().organization.id;
    h.join(&a, org_id, &b, Role::Admin).await;
    h.service
        .update_member_role(&a, org_id, b.user_id, Role::Owner)
        .await
        .unwrap();

    let lockstep = Arc::new(LockstepOwnerCount {
        inner: h.store.clone(),
        gate: Barrier::new(2),
    });
    let service = OrganizationService::new(lockstep, h.store.clone(), h.sessions.clone());

    let (first, second) = tokio::join!(
        service.update_member_role(&a, org_id, a.user_id, Role::Admin),
        service.update_member_role(&b, org_id, b.user_id, Role::Admin),
    );

    let mut results = [first, second];
    results.sort_by_key(|r| r.is_err());
    assert!(results[0].is_ok());
    assert_eq!(
        results[1],
        Err(OrgError::LastOwner("cannot demote the last owner".to_string()))
    );
    assert_eq!(h.owners(org_id).await, 1);
}

#[tokio::test]
async fn test_role_is_checked_after_permissions() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let member = h.user("member@x.com", "Member").await;
    let outsider = h.user("outsider@x.com", "Outsider").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    h.join(&owner, org_id, &member, Role::Member).await;

    assert_eq!(
        h.service
            .update_member_role(&outsider, org_id, member.user_id, "bogus")
            .await,
        Err(OrgError::NotAMember)
    );
    assert_eq!(
        h.service
            .update_member_role(&member, org_id, member.user_id, "bogus")
            .await,
        Err(OrgError::Forbidden("insufficient permissions".to_string()))
    );
    assert_eq!(
        h.service
            .update_member_role(&owner, org_id, member.user_id, "bogus")
            .await,
        Err(OrgError::Validation("invalid role".to_string()))
    );

    assert_eq!(
        h.service.invite(&outsider, org_id, "c@x.com", "bogus").await,
        Err(OrgError::NotAMember)
    );
    assert_eq!(
        h.service.invite(&member, org_id, "c@x.com", "owner").await,
        Err(OrgError::Forbidden("insufficient permissions".to_string()))
    );
    assert_eq!(
        h.service.invite(&owner, org_id, "c@x.com", "owner").await,
        Err(OrgError::Validation(
            "invalid role - must be admin or member".to_string()
        ))
    );
    let updated = h
        .service
        .update_member_role(&owner, org_id, member.user_id, "admin")
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Admin);
}

#[tokio::test]
async fn test_invite_with_unrepresentable_expiry_fails_cleanly() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    let service = OrganizationService::new(h.store.clone(), h.store.clone(), h.sessions.clone())
        .with_config(ServiceConfig {
            invitation_ttl: Duration::days(i64::from(u32::MAX)),
            ..ServiceConfig::default()
        });

    assert_eq!(
        service.invite(&owner, org_id, "b@x.com", Role::Member).await,
        Err(OrgError::internal())
    );
    assert!(h.store.list_invitations(org_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_remove_rules() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let admin1 = h.user("admin1@x.com", "Admin One").await;
    let admin2 = h.user("admin2@x.com", "Admin Two").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    h.join(&owner, org_id, &admin1, Role::Admin).await;
    h.join(&owner, org_id, &admin2, Role::Admin).await;

    h.service
        .remove_member(&admin1, org_id, admin2.user_id)
        .await
        .unwrap();

    // Even with two owners an admin cannot remove one.
    h.join(&owner, org_id, &admin2, Role::Admin).await;
    h.service
        .update_member_role(&owner, org_id, admin2.user_id, Role::Owner)
        .await
        .unwrap();
    assert!(matches!(
        h.service.remove_member(&admin1, org_id, owner.user_id).await,
        Err(OrgError::Forbidden(_))
    ));
    assert_eq!(h.owners(org_id).await, 2);

    assert_eq!(
        h.service
            .remove_member(&owner, org_id, Uuid::now_v7())
            .await
            .unwrap_err(),
        OrgError::NotFound(Resource::Member)
    );
}

#[tokio::test]
async fn test_transfer_validation_leaves_state_unchanged() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    assert!(matches!(
        h.service
            .transfer_ownership(&owner, org_id, owner.user_id)
            .await,
        Err(OrgError::Validation(_))
    ));
    assert!(matches!(
        h.service
            .transfer_ownership(&owner, org_id, Uuid::now_v7())
            .await,
        Err(OrgError::Validation(_))
    ));

    let roster = h.service.list_members(&owner, org_id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].role, Role::Owner);
}

#[tokio::test]
async fn test_transfer_demotes_to_admin() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let next = h.user("next@x.com", "Next").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    h.join(&owner, org_id, &next, Role::Member).await;

    h.service
        .transfer_ownership(&owner, org_id, next.user_id)
        .await
        .unwrap();

    assert_eq!(
        h.store.get_member(org_id, owner.user_id).await.unwrap().role,
        Role::Admin
    );
    assert_eq!(
        h.store.get_member(org_id, next.user_id).await.unwrap().role,
        Role::Owner
    );
}

#[tokio::test]
async fn test_invite_validation() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    assert!(matches!(
        h.service.invite(&owner, org_id, "b@x.com", Role::Owner).await,
        Err(OrgError::Validation(_))
    ));
    assert!(matches!(
        h.service.invite(&owner, org_id, "  ", Role::Member).await,
        Err(OrgError::Validation(_))
    ));
    assert!(matches!(
        h.service.invite(&owner, org_id, "not-an-email", Role::Member).await,
        Err(OrgError::Validation(_))
    ));
    assert_eq!(
        h.service
            .invite(&owner, org_id, "OWNER@x.com", Role::Member)
            .await
            .unwrap_err(),
        OrgError::AlreadyMember
    );

    let invitation = h
        .service
        .invite(&owner, org_id, " New@X.com ", Role::Admin)
        .await
        .unwrap();
    assert_eq!(invitation.email, "new@x.com");
    assert_eq!(invitation.token.len(), 44);
}

#[tokio::test]
async fn test_concurrent_invites_for_same_email() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    let (first, second) = tokio::join!(
        h.service.invite(&owner, org_id, "b@x.com", Role::Member),
        h.service.invite(&owner, org_id, "b@x.com", Role::Member),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(OrgError::InviteExists))));
}

#[tokio::test]
async fn test_accept_twice_reports_not_pending() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let bob = h.user("b@x.com", "Bob").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    let invitation = h
        .service
        .invite(&owner, org_id, "b@x.com", Role::Member)
        .await
        .unwrap();

    h.service
        .accept_invitation(&bob, &invitation.token)
        .await
        .unwrap();
    assert_eq!(
        h.service
            .accept_invitation(&bob, &invitation.token)
            .await
            .unwrap_err(),
        OrgError::InviteNotPending
    );
}

#[tokio::test]
async fn test_accept_expired_marks_expired_without_membership() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let bob = h.user("b@x.com", "Bob").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    let invitation = h
        .service
        .invite(&owner, org_id, "b@x.com", Role::Member)
        .await
        .unwrap();

    h.clock.advance(Duration::days(7) + Duration::seconds(1));

    assert_eq!(
        h.service
            .accept_invitation(&bob, &invitation.token)
            .await
            .unwrap_err(),
        OrgError::InviteExpired
    );
    assert_eq!(
        h.store.get_invitation(invitation.id).await.unwrap().status,
        InvitationStatus::Expired
    );
    assert!(h.store.get_member(org_id, bob.user_id).await.is_err());

    // Expired stays expired.
    assert_eq!(
        h.service
            .accept_invitation(&bob, &invitation.token)
            .await
            .unwrap_err(),
        OrgError::InviteExpired
    );
}

#[tokio::test]
async fn test_accept_checks_addressee_and_existing_membership() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let bob = h.user("b@x.com", "Bob").await;
    let eve = h.user("eve@x.com", "Eve").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    let invitation = h
        .service
        .invite(&owner, org_id, "b@x.com", Role::Member)
        .await
        .unwrap();

    assert!(matches!(
        h.service.accept_invitation(&eve, &invitation.token).await,
        Err(OrgError::Forbidden(_))
    ));
    assert_eq!(
        h.service.accept_invitation(&bob, "no-such-token").await.unwrap_err(),
        OrgError::NotFound(Resource::Invitation)
    );

    // Bob joins through another path before accepting.
    let bob_member = tenancy_org::Member::new(org_id, bob.user_id, Role::Admin);
    h.store.add_member(&bob_member).await.unwrap();

    assert_eq!(
        h.service
            .accept_invitation(&bob, &invitation.token)
            .await
            .unwrap_err(),
        OrgError::AlreadyMember
    );
    assert_eq!(
        h.store.get_invitation(invitation.id).await.unwrap().status,
        InvitationStatus::Accepted
    );
}

#[tokio::test]
async fn test_decline_and_my_invitations() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let bob = h.user("B@X.com", "Bob").await;
    let acme = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    let beta = h.service.create(&owner, "Beta").await.unwrap().organization.id;

    let first = h
        .service
        .invite(&owner, acme, "b@x.com", Role::Member)
        .await
        .unwrap();
    h.clock.advance(Duration::days(6));
    let second = h
        .service
        .invite(&owner, beta, "b@x.com", Role::Admin)
        .await
        .unwrap();

    let mine = h.service.my_invitations(&bob).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].organization_name, "Beta");
    assert_eq!(mine[0].invited_by_name, "Owner");

    // The first invitation lapses from the caller's view but not the org's.
    h.clock.advance(Duration::days(2));
    let mine = h.service.my_invitations(&bob).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].invitation.id, second.id);
    assert_eq!(
        h.service
            .list_invitations(&owner, acme, None)
            .await
            .unwrap()
            .len(),
        1
    );

    h.service
        .decline_invitation(&bob, &second.token)
        .await
        .unwrap();
    assert_eq!(
        h.service
            .decline_invitation(&bob, &second.token)
            .await
            .unwrap_err(),
        OrgError::InviteNotPending
    );
    assert!(h.service.my_invitations(&bob).await.unwrap().is_empty());
    assert_eq!(
        h.store.get_invitation(first.id).await.unwrap().status,
        InvitationStatus::Pending
    );
}

#[tokio::test]
async fn test_org_invitation_listing_and_cancel() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let bob = h.user("b@x.com", "Bob").await;
    let acme = h.service.create(&owner, "Acme").await.unwrap().organization.id;
    let beta = h.service.create(&owner, "Beta").await.unwrap().organization.id;

    let accepted = h
        .service
        .invite(&owner, acme, "b@x.com", Role::Member)
        .await
        .unwrap();
    h.service
        .accept_invitation(&bob, &accepted.token)
        .await
        .unwrap();
    let pending = h
        .service
        .invite(&owner, acme, "c@x.com", Role::Member)
        .await
        .unwrap();

    let all = h.service.list_invitations(&owner, acme, None).await.unwrap();
    assert_eq!(all.len(), 2);
    let only_pending = h
        .service
        .list_invitations(&owner, acme, Some(InvitationStatus::Pending))
        .await
        .unwrap();
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].id, pending.id);

    // Members of the org without manage rights cannot list.
    assert!(matches!(
        h.service.list_invitations(&bob, acme, None).await,
        Err(OrgError::Forbidden(_))
    ));

    // Cross-organization cancel is not found.
    assert_eq!(
        h.service
            .cancel_invitation(&owner, beta, pending.id)
            .await
            .unwrap_err(),
        OrgError::NotFound(Resource::Invitation)
    );
    h.service
        .cancel_invitation(&owner, acme, pending.id)
        .await
        .unwrap();
    assert_eq!(
        h.service.list_invitations(&owner, acme, None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_set_active_org_requires_session_and_membership() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    let outsider = h.user("out@x.com", "Out").await;
    let org_id = h.service.create(&owner, "Acme").await.unwrap().organization.id;

    assert!(matches!(
        h.service.set_active_org(&owner, org_id).await,
        Err(OrgError::Forbidden(_))
    ));

    let session = h.sessions.create(owner.user_id).await.unwrap();
    let with_session = owner.clone().with_session(session.id.clone());
    h.service.set_active_org(&with_session, org_id).await.unwrap();
    assert_eq!(
        h.sessions.get(&session.id).await.unwrap().active_org_id,
        Some(org_id)
    );

    let outsider_session = h.sessions.create(outsider.user_id).await.unwrap();
    let outsider = outsider.with_session(outsider_session.id);
    assert_eq!(
        h.service.set_active_org(&outsider, org_id).await.unwrap_err(),
        OrgError::NotAMember
    );
}

#[tokio::test]
async fn test_user_organizations_sorted_by_name() {
    let h = Harness::new();
    let owner = h.user("owner@x.com", "Owner").await;
    h.service.create(&owner, "Zeta").await.unwrap();
    h.service.create(&owner, "Alpha").await.unwrap();

    let names: Vec<String> = h
        .service
        .list(&owner)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.organization.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Zeta"]);
}
