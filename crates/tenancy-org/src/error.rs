//! Error types for organization operations
//!
//! Two layers: [`StoreError`] is what the membership and invitation stores
//! report, [`OrgError`] is the closed taxonomy the service hands to callers.
//! Every store error is translated at the service boundary; backend detail
//! never crosses it.

use tenancy_auth::AuthError;
use thiserror::Error;

/// Errors reported by the membership and invitation stores.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No organization with the requested ID or slug
    #[error("Organization not found")]
    OrganizationNotFound,

    /// No member row for the (organization, user) pair
    #[error("Member not found")]
    MemberNotFound,

    /// No invitation with the requested ID or token
    #[error("Invitation not found")]
    InvitationNotFound,

    /// A member row already exists for the (organization, user) pair
    #[error("User is already a member")]
    AlreadyMember,

    /// Slug uniqueness violated
    #[error("Slug already exists")]
    SlugExists,

    /// A pending invitation already exists for the (organization, email) pair
    #[error("Pending invitation already exists")]
    InviteExists,

    /// The mutation would leave the organization without an owner
    #[error("Organization must keep at least one owner")]
    LastOwner,

    /// A status transition was attempted on a non-pending invitation
    #[error("Invitation is no longer pending")]
    InvitationNotPending,

    /// Driver or constraint failure with no domain meaning
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// An organization
    Organization,
    /// A member of an organization
    Member,
    /// An invitation
    Invitation,
    /// A user identity
    User,
}

impl Resource {
    fn as_str(&self) -> &'static str {
        match self {
            Resource::Organization => "organization",
            Resource::Member => "member",
            Resource::Invitation => "invitation",
            Resource::User => "user",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization service error types.
///
/// One variant per failure kind visible to callers. The transport layer
/// maps them by exhaustive match.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrgError {
    /// The addressed resource does not exist
    #[error("{0} not found")]
    NotFound(Resource),

    /// The caller (or target) has no membership in the organization
    #[error("not a member of this organization")]
    NotAMember,

    /// The user already belongs to the organization
    #[error("user is already a member of this organization")]
    AlreadyMember,

    /// Slug collision on create
    #[error("an organization with this slug already exists")]
    SlugExists,

    /// A pending invitation already exists for the email
    #[error("a pending invitation already exists for this email")]
    InviteExists,

    /// The invitation expired before it was accepted
    #[error("invitation has expired")]
    InviteExpired,

    /// The invitation was already answered or expired
    #[error("invitation is no longer pending")]
    InviteNotPending,

    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Capability or identity mismatch
    #[error("{0}")]
    Forbidden(String),

    /// The operation would leave the organization without an owner
    #[error("{0}")]
    LastOwner(String),

    /// Storage or collaborator failure; the message is generic
    #[error("{0}")]
    Internal(String),
}

/// Result type for organization service operations.
pub type OrgResult<T> = Result<T, OrgError>;

impl OrgError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        OrgError::Validation(msg.into())
    }

    /// Shorthand for a forbidden failure.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        OrgError::Forbidden(msg.into())
    }

    /// Generic internal failure. The detail belongs in the logs.
    pub fn internal() -> Self {
        OrgError::Internal("internal server error".to_string())
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, OrgError::Internal(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            OrgError::NotFound(_) => 404,
            OrgError::NotAMember | OrgError::Forbidden(_) => 403,
            OrgError::AlreadyMember
            | OrgError::SlugExists
            | OrgError::InviteExists
            | OrgError::InviteExpired
            | OrgError::InviteNotPending
            | OrgError::Validation(_)
            | OrgError::LastOwner(_) => 400,
            OrgError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrgError::NotFound(_) => "not_found",
            OrgError::NotAMember | OrgError::Forbidden(_) => "forbidden",
            OrgError::AlreadyMember
            | OrgError::SlugExists
            | OrgError::InviteExists
            | OrgError::InviteExpired
            | OrgError::InviteNotPending
            | OrgError::Validation(_)
            | OrgError::LastOwner(_) => "bad_request",
            OrgError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for OrgError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrganizationNotFound => OrgError::NotFound(Resource::Organization),
            StoreError::MemberNotFound => OrgError::NotAMember,
            StoreError::InvitationNotFound => OrgError::NotFound(Resource::Invitation),
            StoreError::AlreadyMember => OrgError::AlreadyMember,
            StoreError::SlugExists => OrgError::SlugExists,
            StoreError::InviteExists => OrgError::InviteExists,
            StoreError::LastOwner => {
                OrgError::LastOwner("organization must have at least one owner".to_string())
            }
            StoreError::InvitationNotPending => OrgError::InviteNotPending,
            StoreError::Backend(detail) => {
                tracing::error!(error = %detail, "store backend failure");
                OrgError::internal()
            }
        }
    }
}

impl From<AuthError> for OrgError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound => OrgError::NotFound(Resource::User),
            AuthError::SessionNotFound | AuthError::Unauthorized(_) => {
                OrgError::forbidden("no active session")
            }
            AuthError::ConfigError(detail) | AuthError::Backend(detail) => {
                tracing::error!(error = %detail, "collaborator failure");
                OrgError::internal()
            }
        }
    }
}
