//! OAuth2 endpoints: token, revocation, introspection, and discovery.

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};
use tracing::debug;

use rebate_core::{
    AuthorizationServerMetadata, GrantType, IntrospectionRequest, RevocationRequest, TokenRequest,
};
use rebate_crypto::format::base64_decode_any;
use rebate_oauth::ClientCredentials;

use crate::errors::OAuthApiError;
use crate::AppState;

/// Undo the `application/x-www-form-urlencoded` encoding RFC 6749 §2.3.1
/// applies to Basic credentials.
fn form_decode(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Client credentials from `Authorization: Basic` (preferred) or the form body.
pub fn parse_client_credentials(
    headers: &HeaderMap,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> ClientCredentials {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| base64_decode_any(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|decoded| {
            let (id, secret) = decoded.split_once(':')?;
            Some((form_decode(id)?, form_decode(secret)?))
        });

    match basic {
        Some((id, secret)) => ClientCredentials {
            client_id: Some(id),
            client_secret: (!secret.is_empty()).then_some(secret),
        },
        None => ClientCredentials {
            client_id: client_id.map(String::from),
            client_secret: client_secret.filter(|s| !s.is_empty()).map(String::from),
        },
    }
}

/// POST /oauth/token
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<TokenRequest>,
) -> Result<impl IntoResponse, OAuthApiError> {
    let credentials = parse_client_credentials(
        &headers,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    );
    debug!(
        subsystem = "api",
        grant_type = %req.grant_type,
        client_id = credentials.client_id.as_deref().unwrap_or("-"),
        "Token request"
    );

    let response = state.endpoint.token(&req, &credentials).await?;
    Ok((
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
        ],
        Json(response),
    ))
}

/// POST /oauth/revoke (RFC 7009). 200 for anything short of a client
/// authentication failure.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<RevocationRequest>,
) -> Result<impl IntoResponse, OAuthApiError> {
    let credentials = parse_client_credentials(
        &headers,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    );
    state.endpoint.revoke(&req, &credentials).await?;
    Ok(StatusCode::OK)
}

/// POST /oauth/introspect (RFC 7662)
pub async fn introspect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(req): Form<IntrospectionRequest>,
) -> Result<impl IntoResponse, OAuthApiError> {
    let credentials = parse_client_credentials(
        &headers,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    );
    let response = state.endpoint.introspect(&req, &credentials).await?;
    Ok(Json(response))
}

/// GET /.well-known/oauth-authorization-server (RFC 8414)
pub async fn discovery(State(state): State<AppState>) -> impl IntoResponse {
    let issuer = &state.issuer_url;
    Json(AuthorizationServerMetadata {
        issuer: issuer.clone(),
        token_endpoint: format!("{}/oauth/token", issuer),
        introspection_endpoint: Some(format!("{}/oauth/introspect", issuer)),
        revocation_endpoint: Some(format!("{}/oauth/revoke", issuer)),
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            GrantType::AuthorizationCode.to_string(),
            GrantType::RefreshToken.to_string(),
        ],
        token_endpoint_auth_methods_supported: vec![
            "client_secret_basic".to_string(),
            "client_secret_post".to_string(),
            "none".to_string(),
        ],
        code_challenge_methods_supported: vec!["S256".to_string(), "plain".to_string()],
    })
}
