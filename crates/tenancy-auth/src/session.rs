//! Session collaborator
//!
//! Sessions are opaque server-side records keyed by a random token. They
//! carry the authenticated user and the organization the user is currently
//! working in.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::token::generate_token;

/// Default session lifetime in seconds (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Default session lifetime.
pub fn default_session_ttl() -> Duration {
    Duration::seconds(DEFAULT_SESSION_TTL_SECS)
}

/// A server-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token
    pub id: String,

    /// Authenticated user
    pub user_id: Uuid,

    /// Organization selected by the user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_org_id: Option<Uuid>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session stops being valid
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for `user_id` valid for `ttl` from `now`.
    pub fn new(user_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: generate_token(),
            user_id,
            active_org_id: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the session is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Lifetime left at `now`, floored at zero.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Session persistence consumed by the HTTP guard and `SetActiveOrg`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session for a user.
    async fn create(&self, user_id: Uuid) -> AuthResult<Session>;

    /// Fetch a live session. Expired sessions are deleted and reported as
    /// [`AuthError::SessionNotFound`].
    async fn get(&self, session_id: &str) -> AuthResult<Session>;

    /// Delete a session. Deleting an unknown session is not an error.
    async fn delete(&self, session_id: &str) -> AuthResult<()>;

    /// Extend a live session by a full TTL.
    async fn refresh(&self, session_id: &str) -> AuthResult<Session>;

    /// Record the active organization on a live session, keeping its expiry.
    async fn set_active_org(&self, session_id: &str, org_id: Uuid) -> AuthResult<Session>;
}

/// In-memory session store.
///
/// Suitable for single-process deployments and tests. For multiple server
/// instances use the Redis backend (`redis` feature).
pub struct MemorySessionStore {
    /// Live sessions by ID
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Session lifetime
    ttl: Duration,
    /// Time source for expiry
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MemorySessionStore {
    /// Create a store with the default 24 hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(default_session_ttl())
    }

    /// Create a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a store with a custom TTL and time source.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    /// Number of stored sessions, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: Uuid) -> AuthResult<Session> {
        let session = Session::new(user_id, self.clock.now(), self.ttl);
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(AuthError::Backend("session id collision".to_string()));
        }
        sessions.insert(session.id.clone(), session.clone());

        tracing::debug!(user_id = %user_id, "Session created");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> AuthResult<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(session_id)
            .cloned()
            .ok_or(AuthError::SessionNotFound)?;
        if session.is_expired_at(now) {
            sessions.remove(session_id);
            return Err(AuthError::SessionNotFound);
        }
        Ok(session)
    }

    async fn delete(&self, session_id: &str) -> AuthResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn refresh(&self, session_id: &str) -> AuthResult<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .filter(|s| !s.is_expired_at(now))
            .ok_or(AuthError::SessionNotFound)?;
        session.expires_at = now + self.ttl;
        Ok(session.clone())
    }

    async fn set_active_org(&self, session_id: &str, org_id: Uuid) -> AuthResult<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .filter(|s| !s.is_expired_at(now))
            .ok_or(AuthError::SessionNotFound)?;
        session.active_org_id = Some(org_id);
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (MemorySessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemorySessionStore::with_clock(default_session_ttl(), clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _) = store_with_clock();
        let user_id = Uuid::now_v7();

        let session = store.create(user_id).await.unwrap();
        assert_eq!(session.user_id, user_id);
        assert!(session.active_org_id.is_none());

        let fetched = store.get(&session.id).await.unwrap();
        assert_eq!(fetched, session);
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let (store, clock) = store_with_clock();
        let session = store.create(Uuid::now_v7()).await.unwrap();

        clock.advance(default_session_ttl() + Duration::seconds(1));

        assert!(matches!(
            store.get(&session.id).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_active_org_keeps_expiry() {
        let (store, clock) = store_with_clock();
        let session = store.create(Uuid::now_v7()).await.unwrap();
        clock.advance(Duration::hours(3));

        let org_id = Uuid::now_v7();
        let updated = store.set_active_org(&session.id, org_id).await.unwrap();

        assert_eq!(updated.active_org_id, Some(org_id));
        assert_eq!(updated.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn test_refresh_extends_expiry() {
        let (store, clock) = store_with_clock();
        let session = store.create(Uuid::now_v7()).await.unwrap();
        clock.advance(Duration::hours(10));

        let refreshed = store.refresh(&session.id).await.unwrap();
        assert_eq!(refreshed.expires_at, clock.now() + default_session_ttl());
    }

    #[tokio::test]
    async fn test_unknown_session_operations() {
        let (store, _) = store_with_clock();

        assert!(matches!(
            store.set_active_org("missing", Uuid::now_v7()).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(matches!(
            store.refresh("missing").await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(store.delete("missing").await.is_ok());
    }

    #[test]
    fn test_remaining_ttl_is_floored() {
        let now = Utc::now();
        let session = Session::new(Uuid::now_v7(), now, Duration::hours(1));
        assert_eq!(session.remaining_ttl(now), Duration::hours(1));
        assert_eq!(
            session.remaining_ttl(now + Duration::hours(2)),
            Duration::zero()
        );
    }
}
