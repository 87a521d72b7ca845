//! Session endpoints. Login itself happens elsewhere; these only read and
//! end an existing session.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use tenancy_auth::AuthError;
use tracing::info;

use crate::auth::{resolve_caller, session_id};
use crate::response::{no_content, ok, ApiResult};
use crate::state::AppState;

/// `GET /auth/me`: the current user, or `null` without a session.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let Some(caller) = resolve_caller(&state, &headers).await? else {
        return Ok(ok(serde_json::Value::Null));
    };
    let user = state.identity.get_user(caller.user_id).await?;
    Ok(ok(user))
}

/// `POST /auth/logout`: delete the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    if let Some(id) = session_id(&headers, &state.cookie_name) {
        match state.sessions.delete(&id).await {
            Ok(()) => info!("Session ended"),
            Err(AuthError::SessionNotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(clear_cookie(&state.cookie_name, no_content()))
}

fn clear_cookie(name: &str, mut response: Response) -> Response {
    let cookie = format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}
