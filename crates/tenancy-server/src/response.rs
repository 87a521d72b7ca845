//! Response envelope and error mapping for the HTTP surface.
//!
//! Success bodies are `{"data": ...}`; failures are
//! `{"error": "<kind>", "message": "<text>"}` with the status the kind maps to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tenancy_auth::AuthError;
use tenancy_org::OrgError;
use thiserror::Error;

/// Message returned for every 5xx; the detail stays in the logs.
const INTERNAL_MESSAGE: &str = "internal server error";

/// `{"data": ...}` success body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// 200 with `{"data": value}`.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope { data })).into_response()
}

/// 201 with `{"data": value}`.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope { data })).into_response()
}

/// 204 without a body.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Handler error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Org(#[from] OrgError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Malformed request input caught before the service runs
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,
}

/// Result alias for handlers.
pub type ApiResult<T = Response> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Org(err) => (status(err.status_code()), err.error_code()),
            // Failed session or identity resolution reads as unauthenticated.
            ApiError::Auth(err) if err.is_server_error() => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            ApiError::Auth(_) | ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            match &self {
                ApiError::Auth(_) | ApiError::Unauthorized => "unauthorized".to_string(),
                _ => self.to_string(),
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
