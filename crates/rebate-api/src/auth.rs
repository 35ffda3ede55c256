//! Bearer token authentication for protected resources.
//!
//! The outcome of verifying a request's bearer token is cached in the request
//! extensions as an [`AuthAttempt`], so several extractors on one request
//! verify at most once. Nothing about authentication lives on shared state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::{debug, error};

use rebate_core::{AuthPrincipal, Error};
use rebate_oauth::OAuthModel;

use crate::errors::ApiError;
use crate::AppState;

/// Per-request record of the bearer check.
#[derive(Debug, Clone)]
pub enum AuthAttempt {
    Authenticated(AuthPrincipal),
    Rejected,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn attempt(parts: &Parts, state: &AppState) -> Result<AuthAttempt, ApiError> {
    let Some(token) = bearer_token(parts) else {
        return Ok(AuthAttempt::Rejected);
    };

    match state.service.get_access_token(token).await {
        Ok(Some(record)) => Ok(AuthAttempt::Authenticated(AuthPrincipal::from(&record))),
        Ok(None) => {
            debug!(subsystem = "api", component = "auth", "Bearer token not accepted");
            Ok(AuthAttempt::Rejected)
        }
        Err(Error::SignatureInvalid(_)) => {
            error!(
                subsystem = "api",
                component = "auth",
                path = %parts.uri.path(),
                "Rejected bearer token with invalid signature"
            );
            Ok(AuthAttempt::Rejected)
        }
        Err(e) => Err(e.into()),
    }
}

/// Extractor for endpoints that require a valid access token.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub principal: AuthPrincipal,
}

impl RequireAuth {
    pub fn require_scope(&self, scope: &str) -> Result<(), ApiError> {
        if self.principal.has_scope(scope) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Missing required scope: {}", scope)))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let outcome = match parts.extensions.get::<AuthAttempt>().cloned() {
            Some(cached) => cached,
            None => {
                let outcome = attempt(parts, state).await?;
                parts.extensions.insert(outcome.clone());
                outcome
            }
        };

        match outcome {
            AuthAttempt::Authenticated(principal) => Ok(RequireAuth { principal }),
            AuthAttempt::Rejected => Err(ApiError::Unauthorized("invalid_token".to_string())),
        }
    }
}
