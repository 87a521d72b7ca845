//! # Tenancy Organization Management
//!
//! Organizations, their member rosters and the invitation workflow that
//! adds new members, with the invariants that must hold under concurrent
//! mutation.
//!
//! ## Overview
//!
//! - **Organizations**: tenant boundary with a unique, immutable slug
//! - **Members**: one (organization, user, role) row per pair; every
//!   organization keeps at least one owner
//! - **Invitations**: token-addressed offers with a
//!   `pending -> accepted | declined | expired` state machine
//! - **Stores**: async [`MembershipStore`] / [`InvitationStore`] traits with
//!   in-memory and SQLite backends
//! - **Service**: [`OrganizationService`] applies the role policy and maps
//!   every failure onto [`OrgError`]
//!
//! ## Architecture
//!
//! ```text
//! Caller ──> OrganizationService ──> Role policy (tenancy-rbac)
//!                 │
//!                 ├──> MembershipStore ──> organizations, members, users
//!                 ├──> InvitationStore ──> invitations
//!                 └──> SessionStore    ──> active organization
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tenancy_auth::{Caller, IdentityProvider, MemorySessionStore, User};
//! use tenancy_org::{MemoryStore, OrganizationService};
//! use tenancy_rbac::Role;
//!
//! # async fn example() -> tenancy_org::OrgResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let service = OrganizationService::new(store.clone(), store.clone(), Arc::new(MemorySessionStore::new()));
//!
//! let alice = store.upsert_user(User::new("alice@example.com", "Alice")).await?;
//! let alice = Caller::from_user(&alice);
//!
//! let org = service.create(&alice, "Acme").await?;
//! let invitation = service
//!     .invite(&alice, org.organization.id, "bob@example.com", Role::Member)
//!     .await?;
//! assert_eq!(invitation.email, "bob@example.com");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlite`: SQLite store backend (sqlx)

pub mod error;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod service;
pub mod slug;
pub mod store;

// Re-export main types for convenience
pub use error::{OrgError, OrgResult, Resource, StoreError, StoreResult};
pub use invitation::{
    default_invitation_ttl, Invitation, InvitationStatus, InvitationWithDetails, NewInvitation,
};
pub use membership::{Member, MemberWithUser};
pub use organization::{Organization, OrganizationWithRole};
pub use service::{OrganizationService, ServiceConfig};
pub use slug::generate_slug;
pub use store::{InvitationStore, MembershipStore, MemoryStore};

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
