//! Invitation endpoints, org-scoped and invitee-scoped.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tenancy_org::InvitationStatus;
use uuid::Uuid;

use super::json_body;
use crate::auth::AuthCaller;
use crate::response::{created, no_content, ok, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

/// `POST /organizations/{org_id}/invitations`
pub async fn create_invitation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> ApiResult {
    let req = json_body(payload)?;
    let invitation = state
        .service
        .invite(&caller, org_id, &req.email, &req.role)
        .await?;
    Ok(created(invitation))
}

/// `GET /organizations/{org_id}/invitations[?status=pending]`
pub async fn list_invitations(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            InvitationStatus::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("invalid status filter: {raw}")))?,
        ),
    };
    Ok(ok(state
        .service
        .list_invitations(&caller, org_id, status)
        .await?))
}

/// `DELETE /organizations/{org_id}/invitations/{invite_id}`
pub async fn cancel_invitation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path((org_id, invite_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    state
        .service
        .cancel_invitation(&caller, org_id, invite_id)
        .await?;
    Ok(no_content())
}

/// `GET /invitations`
pub async fn my_invitations(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> ApiResult {
    Ok(ok(state.service.my_invitations(&caller).await?))
}

/// `POST /invitations/{token}/accept`
pub async fn accept_invitation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(token): Path<String>,
) -> ApiResult {
    Ok(ok(state.service.accept_invitation(&caller, &token).await?))
}

/// `POST /invitations/{token}/decline`
pub async fn decline_invitation(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(token): Path<String>,
) -> ApiResult {
    state.service.decline_invitation(&caller, &token).await?;
    Ok(no_content())
}
