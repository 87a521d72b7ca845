//! Invitation domain models
//!
//! An invitation offers an email address a role in an organization. It is
//! identified externally by an opaque token and moves through a small state
//! machine:
//!
//! ```text
//!            ┌──> accepted
//! pending ───┼──> declined
//!            └──> expired
//! ```
//!
//! All three targets are terminal. Expiry is evaluated lazily when someone
//! tries to accept, so an invitation can sit pending past its `expires_at`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tenancy_rbac::Role;
use uuid::Uuid;

/// Default invitation lifetime in days.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

/// Invitation lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Waiting for the invitee
    Pending,
    /// Invitee joined (or was already a member)
    Accepted,
    /// Invitee said no
    Declined,
    /// Accept was attempted after expiry
    Expired,
}

impl InvitationStatus {
    /// Persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }

    /// Parse the persisted string form (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::InvitationStatus;
    ///
    /// assert!(InvitationStatus::Pending.can_transition_to(InvitationStatus::Accepted));
    /// assert!(!InvitationStatus::Accepted.can_transition_to(InvitationStatus::Expired));
    /// assert!(!InvitationStatus::Pending.can_transition_to(InvitationStatus::Pending));
    /// ```
    pub fn can_transition_to(&self, next: InvitationStatus) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique invitation ID
    pub id: Uuid,

    /// Organization the invitee would join
    pub organization_id: Uuid,

    /// Invitee email (normalized, may not belong to any user yet)
    pub email: String,

    /// Role granted on acceptance (never owner)
    pub role: Role,

    /// Opaque link token, never serialized in API payloads
    #[serde(skip_serializing, default)]
    pub token: String,

    /// Member who sent the invitation
    pub invited_by: Uuid,

    /// Lifecycle state
    pub status: InvitationStatus,

    /// After this instant the invitation can no longer be accepted
    pub expires_at: DateTime<Utc>,

    /// When the invitation was created
    pub created_at: DateTime<Utc>,

    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Build a pending invitation row from a request.
    pub fn from_new(new: NewInvitation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id: new.organization_id,
            email: new.email,
            role: new.role,
            token: new.token,
            invited_by: new.invited_by,
            status: InvitationStatus::Pending,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the invitation is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the invitation is still waiting for an answer.
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

/// Fields required to create an invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    /// Target organization
    pub organization_id: Uuid,
    /// Normalized invitee email
    pub email: String,
    /// Proposed role
    pub role: Role,
    /// Freshly generated link token
    pub token: String,
    /// Inviting member
    pub invited_by: Uuid,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    /// Expiry for an invitation created at `now` with a lifetime of `ttl`.
    ///
    /// `None` when the instant falls outside the representable range.
    pub fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
        now.checked_add_signed(ttl)
    }
}

/// An invitation with the names shown to the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationWithDetails {
    /// The invitation
    #[serde(flatten)]
    pub invitation: Invitation,

    /// Name of the organization
    pub organization_name: String,

    /// Name of the inviting user
    pub invited_by_name: String,
}

/// Default invitation lifetime.
pub fn default_invitation_ttl() -> Duration {
    Duration::days(INVITATION_EXPIRY_DAYS)
}

/// Normalize an email for storage and comparison: trimmed and lower-cased.
///
/// # Examples
///
/// ```
/// use tenancy_org::invitation::normalize_email;
///
/// assert_eq!(normalize_email("  Bob@X.com "), "bob@x.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
