use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::ExposeSecret;

use crate::api::types::{ApiEnvelope, ErrorBody};
use crate::api::ServerState;

/// Header carrying the opaque identity of the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug)]
pub enum ApiError {
    /// Rendered as `{"error": ...}`
    Auth(String),
    /// Rendered as `{"detail": ..., "result": null}`
    Detail(StatusCode, String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(error) => {
                (StatusCode::UNAUTHORIZED, Json(ErrorBody { error })).into_response()
            }
            ApiError::Detail(status, detail) => {
                (status, Json(ApiEnvelope::<Option<()>>::new(detail, None))).into_response()
            }
        }
    }
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    ApiError::Detail(StatusCode::BAD_REQUEST, msg.into())
}

pub fn unauthorized(msg: impl Into<String>) -> ApiError {
    ApiError::Auth(msg.into())
}

pub fn not_found(msg: impl Into<String>) -> ApiError {
    ApiError::Detail(StatusCode::NOT_FOUND, msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> ApiError {
    ApiError::Detail(StatusCode::INTERNAL_SERVER_ERROR, msg.into())
}

/// Checks the bearer token when the server has an API key configured.
pub fn validate_auth(state: &ServerState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(key) = &state.auth_key else {
        return Ok(());
    };

    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| unauthorized("Missing authorization"))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid authorization header"))?;

    if auth_str.strip_prefix("Bearer ") != Some(key.expose_secret().as_str()) {
        return Err(unauthorized("Invalid API key"));
    }

    Ok(())
}

/// Resolves the caller's identity from [`USER_ID_HEADER`].
pub fn identity(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unauthorized("Unauthorized"))
}
