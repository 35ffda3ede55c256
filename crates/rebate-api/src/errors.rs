//! HTTP error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use rebate_core::OAuthError;
use rebate_oauth::GrantError;

/// Token endpoint error, rendered as an RFC 6749 §5.2 body.
#[derive(Debug)]
pub enum OAuthApiError {
    OAuth(OAuthError),
    Internal(rebate_core::Error),
}

impl From<GrantError> for OAuthApiError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::Protocol(e) => OAuthApiError::OAuth(e),
            GrantError::Server(e) => OAuthApiError::Internal(e),
        }
    }
}

impl From<rebate_core::Error> for OAuthApiError {
    fn from(err: rebate_core::Error) -> Self {
        OAuthApiError::Internal(err)
    }
}

impl IntoResponse for OAuthApiError {
    fn into_response(self) -> Response {
        let err = match self {
            OAuthApiError::OAuth(err) => err,
            OAuthApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Token endpoint failure");
                OAuthError::server_error("internal error")
            }
        };

        let status = match err.error.as_str() {
            "invalid_client" => StatusCode::UNAUTHORIZED,
            "unauthorized_client" => StatusCode::FORBIDDEN,
            "server_error" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let mut response = (status, Json(err)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"rebate\""),
            );
        }
        response
    }
}

/// Resource endpoint error.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    Internal(rebate_core::Error),
}

impl From<rebate_core::Error> for ApiError {
    fn from(err: rebate_core::Error) -> Self {
        match err {
            rebate_core::Error::SignatureInvalid(_) => {
                ApiError::Unauthorized("invalid_token".to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let mut response = (status, Json(serde_json::json!({ "error": message }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"rebate\", error=\"invalid_token\""),
            );
        }
        response
    }
}
