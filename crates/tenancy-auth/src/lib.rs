//! # Tenancy Authentication Collaborators
//!
//! Interfaces the organization service consumes but does not own: who the
//! caller is, which session they arrived on, and what time it is.
//!
//! ## Overview
//!
//! - **Identity**: [`User`] records and the [`IdentityProvider`] lookup trait
//! - **Caller**: the explicit authenticated principal passed to every operation
//! - **Sessions**: [`SessionStore`] with in-memory and Redis backends
//! - **Tokens**: 32-byte URL-safe random tokens for sessions and invitations
//! - **Clock**: injectable time source for expiry checks
//!
//! ## Features
//!
//! - `redis`: Redis-backed session store
//!
//! ## Usage
//!
//! ```rust
//! use tenancy_auth::{MemorySessionStore, SessionStore};
//! use uuid::Uuid;
//!
//! # async fn example() -> tenancy_auth::AuthResult<()> {
//! let store = MemorySessionStore::new();
//! let session = store.create(Uuid::now_v7()).await?;
//! let same = store.get(&session.id).await?;
//! assert_eq!(same.user_id, session.user_id);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod identity;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod session;
pub mod token;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use identity::{Caller, IdentityProvider, User};
pub use session::{default_session_ttl, MemorySessionStore, Session, SessionStore};
pub use token::generate_token;

#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;
