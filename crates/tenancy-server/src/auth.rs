//! Session guard.
//!
//! The session ID comes from the session cookie or an `Authorization: Bearer`
//! header. A resolvable session with a live user becomes a [`Caller`] in the
//! request extensions; anything else is answered with 401.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tenancy_auth::{AuthError, Caller};
use tracing::debug;

use crate::response::ApiError;
use crate::state::AppState;

/// Session ID carried by the request, cookie first.
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolve the caller for a request.
///
/// `Ok(None)` when there is no usable session. Backend failures propagate.
pub async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<Option<Caller>, ApiError> {
    let Some(session_id) = session_id(headers, &state.cookie_name) else {
        return Ok(None);
    };

    let session = match state.sessions.get(&session_id).await {
        Ok(session) => session,
        Err(AuthError::SessionNotFound) => {
            debug!("Unknown or expired session");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    match state.identity.get_user(session.user_id).await {
        Ok(user) => Ok(Some(Caller::from_user(&user).with_session(session.id))),
        Err(AuthError::UserNotFound) => {
            debug!(user_id = %session.user_id, "Session user no longer exists");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Reject requests without a valid session; insert the [`Caller`] otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match resolve_caller(&state, request.headers()).await {
        Ok(Some(caller)) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Ok(None) => ApiError::Unauthorized.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Authenticated caller, populated by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

impl<S> axum::extract::FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(AuthCaller)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": "unauthorized", "message": "unauthorized" })),
                )
            })
    }
}
