//! Redis-backed session store for multi-instance deployments.
//!
//! Sessions are stored as JSON under `{prefix}{session_id}` with a Redis TTL
//! matching the session expiry, so Redis evicts them on its own. Expiry is
//! still re-checked on read against the configured clock.

use async_trait::async_trait;
use chrono::Duration;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::session::{default_session_ttl, Session, SessionStore};

/// Default key prefix for session records.
pub const DEFAULT_SESSION_PREFIX: &str = "session:";

/// Redis-backed [`SessionStore`].
///
/// # Example
///
/// ```rust,no_run
/// use tenancy_auth::RedisSessionStore;
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let store = RedisSessionStore::new("redis://localhost:6379").await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Shared multiplexed connection
    conn: MultiplexedConnection,

    /// Key prefix for all session keys
    prefix: String,

    /// Session lifetime
    ttl: Duration,

    /// Time source for expiry
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RedisSessionStore {
    /// Connect with the default prefix and TTL.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., `redis://localhost:6379`)
    pub async fn new(redis_url: &str) -> AuthResult<Self> {
        Self::with_options(redis_url, DEFAULT_SESSION_PREFIX, default_session_ttl()).await
    }

    /// Connect with a custom key prefix and session TTL.
    pub async fn with_options(redis_url: &str, prefix: &str, ttl: Duration) -> AuthResult<Self> {
        let client = Client::open(redis_url).map_err(|e| AuthError::ConfigError(e.to_string()))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        Ok(Self {
            conn,
            prefix: prefix.to_string(),
            ttl,
            clock: Arc::new(SystemClock),
        })
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.prefix, session_id)
    }

    async fn write(&self, session: &Session, ttl: Duration) -> AuthResult<()> {
        let data =
            serde_json::to_string(session).map_err(|e| AuthError::Backend(e.to_string()))?;
        // Redis rejects EX 0, keep at least one second.
        let secs = ttl.num_seconds().max(1);

        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(&session.id))
            .arg(data)
            .arg("EX")
            .arg(secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: Uuid) -> AuthResult<Session> {
        let session = Session::new(user_id, self.clock.now(), self.ttl);
        self.write(&session, self.ttl).await?;

        tracing::debug!(user_id = %user_id, "Session created in Redis");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> AuthResult<Session> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn
            .get(self.key(session_id))
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let data = data.ok_or(AuthError::SessionNotFound)?;
        let session: Session =
            serde_json::from_str(&data).map_err(|e| AuthError::Backend(e.to_string()))?;

        if session.is_expired_at(self.clock.now()) {
            self.delete(session_id).await?;
            return Err(AuthError::SessionNotFound);
        }

        Ok(session)
    }

    async fn delete(&self, session_id: &str) -> AuthResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(session_id))
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn refresh(&self, session_id: &str) -> AuthResult<Session> {
        let mut session = self.get(session_id).await?;
        session.expires_at = self.clock.now() + self.ttl;
        self.write(&session, self.ttl).await?;
        Ok(session)
    }

    async fn set_active_org(&self, session_id: &str, org_id: Uuid) -> AuthResult<Session> {
        let mut session = self.get(session_id).await?;
        session.active_org_id = Some(org_id);

        let remaining = session.remaining_ttl(self.clock.now());
        let ttl = if remaining > Duration::zero() {
            remaining
        } else {
            self.ttl
        };
        self.write(&session, ttl).await?;
        Ok(session)
    }
}
