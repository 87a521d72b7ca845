pub mod auth;
pub mod health;
pub mod invitations;
pub mod organizations;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::response::ApiError;

/// Unwrap a JSON body, reporting malformed input in the error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

// Re-export all handlers for route registration
pub use auth::{logout, me};
pub use health::health_handler;
pub use invitations::{
    accept_invitation, cancel_invitation, create_invitation, decline_invitation,
    list_invitations, my_invitations,
};
pub use organizations::{
    create_organization, delete_organization, get_organization, get_organization_by_slug,
    leave_organization, list_members, list_organizations, remove_member, set_active_organization,
    transfer_ownership, update_member_role, update_organization,
};
