//! # Tenancy RBAC (Role Policy)
//!
//! Pure decision functions over an organization role.
//!
//! ## Overview
//!
//! - **Roles**: `owner > admin > member`, a closed enumeration
//! - **Capabilities**: named permissions derived from a role, never stored
//!
//! ## Capability Table
//!
//! ```text
//!                     member  admin  owner
//! manage-members        -       x      x
//! delete-organization   -       -      x
//! transfer-ownership    -       -      x
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_rbac::{Capability, Role};
//!
//! let role = Role::parse("admin").unwrap();
//! assert!(role.can(Capability::ManageMembers));
//! assert!(!role.can(Capability::DeleteOrganization));
//! ```

pub mod capabilities;
pub mod roles;

// Re-export main types for convenience
pub use capabilities::Capability;
pub use roles::{ParseRoleError, Role};
