//! SQLite store tests over an isolated in-memory database.
#![cfg(feature = "sqlite")]

use chrono::{Duration, Utc};
use tenancy_auth::{IdentityProvider, User};
use tenancy_org::{
    InvitationStatus, InvitationStore, Member, MembershipStore, NewInvitation, Organization,
    SqliteStore, StoreError,
};
use tenancy_rbac::Role;
use uuid::Uuid;

/// Fresh store with the schema applied. One connection, so every query sees
/// the same in-memory database.
async fn test_store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to create in-memory SQLite store")
}

async fn seeded() -> (SqliteStore, Organization, User) {
    let store = test_store().await;
    let owner = store
        .upsert_user(User::new("owner@example.com", "Owner"))
        .await
        .unwrap();
    let org = Organization::new("Acme", "acme-12345678", owner.id);
    store.create_organization(&org).await.unwrap();
    (store, org, owner)
}

async fn add_user(store: &SqliteStore, org: &Organization, email: &str, name: &str, role: Role) -> User {
    let user = store.upsert_user(User::new(email, name)).await.unwrap();
    store
        .add_member(&Member::new(org.id, user.id, role))
        .await
        .unwrap();
    user
}

fn invitation(org_id: Uuid, invited_by: Uuid, email: &str, token: &str) -> NewInvitation {
    NewInvitation {
        organization_id: org_id,
        email: email.to_string(),
        role: Role::Member,
        token: token.to_string(),
        invited_by,
        expires_at: Utc::now() + Duration::days(7),
    }
}

#[tokio::test]
async fn test_create_and_fetch_organization() {
    let (store, org, owner) = seeded().await;

    let fetched = store.get_organization(org.id).await.unwrap();
    assert_eq!(fetched.name, "Acme");
    assert_eq!(fetched.created_by, owner.id);
    assert_eq!(
        store.get_organization_by_slug("acme-12345678").await.unwrap().id,
        org.id
    );

    let member = store.get_member(org.id, owner.id).await.unwrap();
    assert_eq!(member.role, Role::Owner);
}

#[tokio::test]
async fn test_slug_collision_rolls_back() {
    let (store, org, _) = seeded().await;
    let other = Uuid::now_v7();

    let err = store
        .create_organization(&Organization::new("Acme 2", org.slug.clone(), other))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::SlugExists);
    assert!(store.list_user_organizations(other).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_member_rejected() {
    let (store, org, owner) = seeded().await;

    assert_eq!(
        store
            .add_member(&Member::new(org.id, owner.id, Role::Member))
            .await
            .unwrap_err(),
        StoreError::AlreadyMember
    );
}

#[tokio::test]
async fn test_roster_order() {
    let (store, org, _) = seeded().await;
    add_user(&store, &org, "zed@example.com", "Zed", Role::Member).await;
    add_user(&store, &org, "amy@example.com", "Amy", Role::Member).await;
    add_user(&store, &org, "bea@example.com", "Bea", Role::Admin).await;

    let names: Vec<String> = store
        .list_members(org.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Owner", "Bea", "Amy", "Zed"]);
}

#[tokio::test]
async fn test_owner_floor_guards() {
    let (store, org, owner) = seeded().await;

    assert_eq!(
        store
            .update_member_role(org.id, owner.id, Role::Admin)
            .await
            .unwrap_err(),
        StoreError::LastOwner
    );
    assert_eq!(
        store.remove_member(org.id, owner.id).await.unwrap_err(),
        StoreError::LastOwner
    );
    assert_eq!(
        store
            .update_member_role(org.id, Uuid::now_v7(), Role::Admin)
            .await
            .unwrap_err(),
        StoreError::MemberNotFound
    );
    assert_eq!(store.count_owners(org.id).await.unwrap(), 1);

    let second = add_user(&store, &org, "two@example.com", "Two", Role::Owner).await;
    let demoted = store
        .update_member_role(org.id, owner.id, Role::Member)
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Member);
    assert_eq!(
        store.remove_member(org.id, second.id).await.unwrap_err(),
        StoreError::LastOwner
    );
}

#[tokio::test]
async fn test_transfer_is_atomic() {
    let (store, org, owner) = seeded().await;

    assert_eq!(
        store
            .transfer_ownership(org.id, owner.id, Uuid::now_v7())
            .await
            .unwrap_err(),
        StoreError::MemberNotFound
    );
    assert_eq!(
        store.get_member(org.id, owner.id).await.unwrap().role,
        Role::Owner
    );

    let next = add_user(&store, &org, "next@example.com", "Next", Role::Member).await;
    store
        .transfer_ownership(org.id, owner.id, next.id)
        .await
        .unwrap();
    assert_eq!(
        store.get_member(org.id, owner.id).await.unwrap().role,
        Role::Admin
    );
    assert_eq!(store.get_member(org.id, next.id).await.unwrap().role, Role::Owner);
}

#[tokio::test]
async fn test_member_lookup_by_email_ignores_case() {
    let (store, org, _) = seeded().await;

    assert!(store
        .is_member_by_email(org.id, "OWNER@example.com")
        .await
        .unwrap());
    assert!(!store
        .is_member_by_email(org.id, "nobody@example.com")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_pending_invitation_uniqueness() {
    let (store, org, owner) = seeded().await;
    let first = store
        .create_invitation(invitation(org.id, owner.id, "b@x.com", "t1"))
        .await
        .unwrap();

    assert_eq!(
        store
            .create_invitation(invitation(org.id, owner.id, "b@x.com", "t2"))
            .await
            .unwrap_err(),
        StoreError::InviteExists
    );

    // Token collisions are a backend failure, not a conflict kind.
    assert!(matches!(
        store
            .create_invitation(invitation(org.id, owner.id, "c@x.com", "t1"))
            .await,
        Err(StoreError::Backend(_))
    ));

    store
        .transition_invitation(first.id, InvitationStatus::Declined)
        .await
        .unwrap();
    store
        .create_invitation(invitation(org.id, owner.id, "b@x.com", "t3"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invitation_transitions_are_conditional() {
    let (store, org, owner) = seeded().await;
    let inv = store
        .create_invitation(invitation(org.id, owner.id, "b@x.com", "tok"))
        .await
        .unwrap();

    let accepted = store
        .transition_invitation(inv.id, InvitationStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.status, InvitationStatus::Accepted);

    assert_eq!(
        store
            .transition_invitation(inv.id, InvitationStatus::Expired)
            .await
            .unwrap_err(),
        StoreError::InvitationNotPending
    );
    assert_eq!(
        store
            .transition_invitation(Uuid::now_v7(), InvitationStatus::Expired)
            .await
            .unwrap_err(),
        StoreError::InvitationNotFound
    );
}

#[tokio::test]
async fn test_invitation_queries() {
    let (store, org, owner) = seeded().await;
    let first = store
        .create_invitation(invitation(org.id, owner.id, "b@x.com", "t1"))
        .await
        .unwrap();
    let mut stale = invitation(org.id, owner.id, "c@x.com", "t2");
    stale.expires_at = Utc::now() - Duration::hours(1);
    let stale = store.create_invitation(stale).await.unwrap();

    let details = store.get_invitation_by_token("t1").await.unwrap();
    assert_eq!(details.invitation.id, first.id);
    assert_eq!(details.organization_name, "Acme");
    assert_eq!(details.invited_by_name, "Owner");

    let all = store.list_invitations(org.id, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, stale.id);

    let pending = store
        .list_invitations(org.id, Some(InvitationStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    let accepted = store
        .list_invitations(org.id, Some(InvitationStatus::Accepted))
        .await
        .unwrap();
    assert!(accepted.is_empty());

    assert!(store
        .list_pending_for_email("c@x.com", Utc::now())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .list_pending_for_email("b@x.com", Utc::now())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_delete_cascades() {
    let (store, org, owner) = seeded().await;
    let inv = store
        .create_invitation(invitation(org.id, owner.id, "b@x.com", "t1"))
        .await
        .unwrap();

    store.delete_organization(org.id).await.unwrap();

    assert_eq!(
        store.get_organization(org.id).await.unwrap_err(),
        StoreError::OrganizationNotFound
    );
    assert_eq!(
        store.get_member(org.id, owner.id).await.unwrap_err(),
        StoreError::MemberNotFound
    );
    assert_eq!(
        store.get_invitation(inv.id).await.unwrap_err(),
        StoreError::InvitationNotFound
    );
    assert_eq!(
        store.delete_organization(org.id).await.unwrap_err(),
        StoreError::OrganizationNotFound
    );
}

#[tokio::test]
async fn test_upsert_user_keeps_id() {
    let store = test_store().await;
    let first = store
        .upsert_user(User::new("a@example.com", "A"))
        .await
        .unwrap();
    let again = store
        .upsert_user(User::new("A@example.com", "A Renamed").with_picture("https://x/a.png"))
        .await
        .unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.name, "A Renamed");
    assert_eq!(again.picture.as_deref(), Some("https://x/a.png"));
    assert_eq!(store.get_user(first.id).await.unwrap().email, "a@example.com");
}
