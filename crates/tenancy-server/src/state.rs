//! Shared application state and its construction from [`Config`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tenancy_auth::{IdentityProvider, MemorySessionStore, SessionStore};
use tenancy_org::{InvitationStore, MembershipStore, MemoryStore, OrganizationService, SqliteStore};
use tracing::info;

use crate::config::{Config, SessionBackend};

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: OrganizationService,
    pub sessions: Arc<dyn SessionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cookie_name: Arc<str>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state over a single store backend that also answers identity lookups.
    pub fn new<S>(store: Arc<S>, sessions: Arc<dyn SessionStore>, config: &Config) -> Self
    where
        S: MembershipStore + InvitationStore + IdentityProvider + 'static,
    {
        let service = OrganizationService::new(store.clone(), store.clone(), sessions.clone())
            .with_config(config.service_config());

        Self {
            service,
            sessions,
            identity: store,
            cookie_name: Arc::from(config.session.cookie_name.as_str()),
        }
    }
}

/// Build state from configuration, connecting the selected backends.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let sessions = build_sessions(config).await?;

    if config.database.is_memory() {
        info!("Using in-memory store");
        return Ok(AppState::new(Arc::new(MemoryStore::new()), sessions, config));
    }

    let store = SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    Ok(AppState::new(Arc::new(store), sessions, config))
}

async fn build_sessions(config: &Config) -> Result<Arc<dyn SessionStore>> {
    match config.session.backend {
        SessionBackend::Memory => {
            info!(ttl_secs = config.session.ttl_secs, "Using in-memory sessions");
            Ok(Arc::new(MemorySessionStore::with_ttl(config.session.ttl())))
        }
        #[cfg(feature = "redis")]
        SessionBackend::Redis => {
            info!(ttl_secs = config.session.ttl_secs, "Using Redis sessions");
            let store = tenancy_auth::RedisSessionStore::with_options(
                &config.session.redis_url,
                tenancy_auth::redis_store::DEFAULT_SESSION_PREFIX,
                config.session.ttl(),
            )
            .await
            .context("Failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        SessionBackend::Redis => {
            anyhow::bail!("session.backend = \"redis\" requires the `redis` feature")
        }
    }
}
