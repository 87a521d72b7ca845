//! User identities
//!
//! Users are owned by the identity collaborator (OAuth login creates them).
//! The organization crate only stores references to [`User::id`] and reads
//! display fields for member listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthResult;

/// A resolved user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Verified email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// When the user was first seen
    pub created_at: DateTime<Utc>,

    /// When the profile was last refreshed
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a fresh UUID v7 ID.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            name: name.into(),
            picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the avatar URL.
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

/// The authenticated principal of a request.
///
/// Every organization operation takes the caller explicitly instead of
/// reading it from request-scoped state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// The user's verified email
    pub email: String,

    /// Session the request arrived on, if any
    pub session_id: Option<String>,
}

impl Caller {
    /// Build a caller from a resolved user, without a session.
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            session_id: None,
        }
    }

    /// Attach the session the caller authenticated with.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Identity lookups consumed by the session guard and the stores.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up a user by ID. Unknown IDs yield [`AuthError::UserNotFound`](crate::AuthError::UserNotFound).
    async fn get_user(&self, id: Uuid) -> AuthResult<User>;

    /// Look up a user by email. Unknown emails yield [`AuthError::UserNotFound`](crate::AuthError::UserNotFound).
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User>;

    /// Insert a user, or refresh name/picture of the user with the same email.
    ///
    /// Returns the stored row; its ID is the existing one when the email was
    /// already known.
    async fn upsert_user(&self, user: User) -> AuthResult<User>;
}
