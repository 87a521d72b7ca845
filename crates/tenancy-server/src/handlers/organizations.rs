//! Organization, member and ownership endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::json_body;
use crate::auth::AuthCaller;
use crate::response::{created, no_content, ok, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferRequest {
    new_owner_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveOrgRequest {
    organization_id: Option<Uuid>,
}

/// `POST /organizations`
pub async fn create_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> ApiResult {
    let req = json_body(payload)?;
    let org = state.service.create(&caller, &req.name).await?;
    Ok(created(org))
}

/// `GET /organizations`
pub async fn list_organizations(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
) -> ApiResult {
    Ok(ok(state.service.list(&caller).await?))
}

/// `PUT /organizations/active`
pub async fn set_active_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    payload: Result<Json<ActiveOrgRequest>, JsonRejection>,
) -> ApiResult {
    let org_id = json_body(payload)?
        .organization_id
        .ok_or_else(|| ApiError::bad_request("organization_id is required"))?;
    state.service.set_active_org(&caller, org_id).await?;
    Ok(no_content())
}

/// `GET /organizations/{org_id}`
pub async fn get_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    Ok(ok(state.service.get(&caller, org_id).await?))
}

/// `GET /organizations/by-slug/{slug}`
pub async fn get_organization_by_slug(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(slug): Path<String>,
) -> ApiResult {
    Ok(ok(state.service.get_by_slug(&caller, &slug).await?))
}

/// `PUT /organizations/{org_id}`
pub async fn update_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> ApiResult {
    let req = json_body(payload)?;
    Ok(ok(state.service.update_name(&caller, org_id, &req.name).await?))
}

/// `DELETE /organizations/{org_id}`
pub async fn delete_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    state.service.delete(&caller, org_id).await?;
    Ok(no_content())
}

/// `POST /organizations/{org_id}/leave`
pub async fn leave_organization(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    state.service.leave(&caller, org_id).await?;
    Ok(no_content())
}

/// `POST /organizations/{org_id}/transfer`
pub async fn transfer_ownership(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult {
    let new_owner_id = json_body(payload)?
        .new_owner_id
        .ok_or_else(|| ApiError::bad_request("new_owner_id is required"))?;
    state
        .service
        .transfer_ownership(&caller, org_id, new_owner_id)
        .await?;
    Ok(no_content())
}

/// `GET /organizations/{org_id}/members`
pub async fn list_members(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path(org_id): Path<Uuid>,
) -> ApiResult {
    Ok(ok(state.service.list_members(&caller, org_id).await?))
}

/// `PUT /organizations/{org_id}/members/{user_id}`
pub async fn update_member_role(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> ApiResult {
    let req = json_body(payload)?;
    let member = state
        .service
        .update_member_role(&caller, org_id, user_id, &req.role)
        .await?;
    Ok(ok(member))
}

/// `DELETE /organizations/{org_id}/members/{user_id}`
pub async fn remove_member(
    State(state): State<AppState>,
    AuthCaller(caller): AuthCaller,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    state.service.remove_member(&caller, org_id, user_id).await?;
    Ok(no_content())
}
