//! Core data models for the rebate token lifecycle.
//!
//! These types are shared across all rebate crates: the persisted entities
//! (clients, users, authorization codes, token pairs), the joined read models
//! handed to the protocol hooks, and the RFC 6749 / 7662 / 8414 wire types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::Error;

// =============================================================================
// SCOPE
// =============================================================================

/// Split a space-delimited scope string into an ordered list.
///
/// Duplicate entries are dropped; first occurrence wins.
pub fn parse_scope(scope: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in scope.split_whitespace() {
        if !out.iter().any(|existing| existing == s) {
            out.push(s.to_string());
        }
    }
    out
}

/// Join a scope list into the space-delimited wire form.
pub fn join_scope(scope: &[String]) -> String {
    scope.join(" ")
}

// =============================================================================
// CLIENTS
// =============================================================================

/// OAuth2 grant types a client may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::RefreshToken => "refresh_token",
            GrantType::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "refresh_token" => Ok(GrantType::RefreshToken),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            other => Err(Error::InvalidInput(format!("unknown grant type: {}", other))),
        }
    }
}

/// A registered OAuth client, normalized for the protocol layer.
///
/// The secret hash is deliberately absent; see [`StoredClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Exact absolute URIs. No prefix or wildcard matching is ever applied.
    pub redirect_uris: Vec<String>,
    pub grants: Vec<GrantType>,
    /// Owning user, if any.
    pub user_id: Option<Uuid>,
    /// True when the client authenticates with a secret.
    pub is_confidential: bool,
    pub access_token_lifetime_secs: i64,
    pub refresh_token_lifetime_secs: i64,
}

impl Client {
    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.grants.contains(&grant)
    }

    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }
}

/// A client row as persisted, including the SHA-256 hex digest of its secret.
#[derive(Debug, Clone)]
pub struct StoredClient {
    pub client: Client,
    /// `None` for public (PKCE-only) clients.
    pub secret_hash: Option<String>,
}

/// Input for registering a client (fixtures and seeding only).
#[derive(Debug, Clone)]
pub struct NewClient {
    pub id: String,
    pub name: String,
    /// Plaintext secret; hashed before it is stored. `None` for public clients.
    pub secret: Option<String>,
    pub redirect_uris: Vec<String>,
    pub grants: Vec<GrantType>,
    pub user_id: Option<Uuid>,
    pub access_token_lifetime_secs: Option<i64>,
    pub refresh_token_lifetime_secs: Option<i64>,
}

impl NewClient {
    /// A public client with defaults for the authorization_code + refresh_token grants.
    pub fn public(id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            secret: None,
            redirect_uris: vec![redirect_uri.into()],
            grants: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            user_id: None,
            access_token_lifetime_secs: None,
            refresh_token_lifetime_secs: None,
        }
    }

    /// A confidential client with defaults for the authorization_code + refresh_token grants.
    pub fn confidential(
        id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::public(id, redirect_uri)
        }
    }

    pub fn access_lifetime(&self) -> i64 {
        self.access_token_lifetime_secs
            .unwrap_or(defaults::ACCESS_TOKEN_LIFETIME_SECS)
    }

    pub fn refresh_lifetime(&self) -> i64 {
        self.refresh_token_lifetime_secs
            .unwrap_or(defaults::REFRESH_TOKEN_LIFETIME_SECS)
    }
}

// =============================================================================
// USERS
// =============================================================================

/// An end user, as known to the identity store. Used to stamp `sub`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// AUTHORIZATION CODES
// =============================================================================

/// PKCE code challenge method (RFC 7636 §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "S256")]
    S256,
}

impl CodeChallengeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::Plain => "plain",
            CodeChallengeMethod::S256 => "S256",
        }
    }
}

impl fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(CodeChallengeMethod::Plain),
            "S256" => Ok(CodeChallengeMethod::S256),
            other => Err(Error::InvalidInput(format!(
                "unsupported code_challenge_method: {}",
                other
            ))),
        }
    }
}

/// A single-use authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The code value itself.
    pub id: String,
    pub client_id: String,
    pub user_id: Uuid,
    pub redirect_uri: String,
    pub scope: Vec<String>,
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields the protocol layer supplies when a code is issued.
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    pub redirect_uri: String,
    pub scope: Vec<String>,
    pub code_challenge: String,
    pub code_challenge_method: CodeChallengeMethod,
}

/// An authorization code together with the client and user it is bound to.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRecord {
    pub code: AuthorizationCode,
    pub client: Client,
    pub user: User,
}

// =============================================================================
// TOKENS
// =============================================================================

/// Persisted access token metadata. The signed JWT itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// JWT `jti`.
    pub id: String,
    pub user_id: Uuid,
    pub client_id: String,
    pub scope: Vec<String>,
    pub revoked: bool,
    /// Mirrors the JWT `exp` claim.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Persisted refresh token. Handed out only as a sealed blob over `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: String,
    pub access_token_id: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A live access token joined with its client, user, and refresh token.
#[derive(Debug, Clone)]
pub struct AccessTokenRecord {
    pub access_token: AccessToken,
    pub client: Client,
    pub user: User,
    pub refresh_token: Option<RefreshToken>,
}

/// A refresh token joined with its access token, client, and user.
///
/// May carry `revoked = true`: the rotator inspects it to detect replay.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub refresh_token: RefreshToken,
    pub access_token: AccessToken,
    pub client: Client,
    pub user: User,
}

/// A freshly minted token pair as returned to the protocol layer.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    /// Signed JWT.
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    /// Sealed refresh blob.
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub scope: Vec<String>,
    /// Internal id of the refresh token this pair replaces, for pairs issued
    /// by the refresh grant. Never sent to the client.
    pub rotated_from: Option<String>,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedTokens")
            .field("access_token", &"[REDACTED]")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .field("scope", &self.scope)
            .field(
                "rotated_from",
                &self.rotated_from.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl IssuedTokens {
    /// Build the RFC 6749 §5.1 response body, with `expires_in` relative to `now`.
    pub fn to_response(&self, now: DateTime<Utc>) -> TokenResponse {
        TokenResponse {
            access_token: self.access_token.clone(),
            token_type: defaults::TOKEN_TYPE_BEARER.to_string(),
            expires_in: (self.access_token_expires_at - now).num_seconds().max(0),
            refresh_token: self.refresh_token.clone(),
            scope: Some(join_scope(&self.scope)),
        }
    }
}

/// Internal result of a refresh rotation attempt.
///
/// Only the boolean "rotated or not" crosses the hook boundary; reuse is
/// indistinguishable from any other denial to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// This caller won the conditional update; the old pair is now revoked.
    Rotated,
    /// The refresh token was already revoked; every credential of the user was revoked.
    ReuseDetected {
        access_revoked: u64,
        refresh_revoked: u64,
    },
    /// The refresh token no longer exists.
    NotFound,
}

impl RotationOutcome {
    pub fn is_rotated(&self) -> bool {
        matches!(self, RotationOutcome::Rotated)
    }
}

/// Row counts from a bulk per-user revocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationCounts {
    pub access_tokens: u64,
    pub refresh_tokens: u64,
}

/// Row counts from an expired-state cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCounts {
    pub authorization_codes: u64,
    pub access_tokens: u64,
    pub refresh_tokens: u64,
}

impl CleanupCounts {
    pub fn total(&self) -> u64 {
        self.authorization_codes + self.access_tokens + self.refresh_tokens
    }
}

/// Authenticated bearer of a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
    pub client_id: String,
    pub scope: Vec<String>,
    pub jti: String,
}

impl AuthPrincipal {
    pub fn has_scope(&self, required: &str) -> bool {
        self.scope.iter().any(|s| s == required)
    }
}

impl From<&AccessTokenRecord> for AuthPrincipal {
    fn from(record: &AccessTokenRecord) -> Self {
        Self {
            user_id: record.user.id,
            client_id: record.client.id.clone(),
            scope: record.access_token.scope.clone(),
            jti: record.access_token.id.clone(),
        }
    }
}

// =============================================================================
// WIRE TYPES (RFC 6749 / 7009 / 7662 / 8414)
// =============================================================================

/// OAuth2 token request (form body).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Token revocation request (RFC 7009).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevocationRequest {
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Token introspection request (RFC 7662).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntrospectionRequest {
    pub token: String,
    #[serde(default)]
    pub token_type_hint: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// OAuth2 token introspection response (RFC 7662).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenIntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenIntrospectionResponse {
    /// The generic response for anything that is not a live token.
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// OAuth2 error response (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthError {
    fn new(error: &str, description: &str) -> Self {
        Self {
            error: error.to_string(),
            error_description: Some(description.to_string()),
        }
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::new("invalid_request", description)
    }

    pub fn invalid_client(description: &str) -> Self {
        Self::new("invalid_client", description)
    }

    pub fn invalid_grant(description: &str) -> Self {
        Self::new("invalid_grant", description)
    }

    pub fn unauthorized_client(description: &str) -> Self {
        Self::new("unauthorized_client", description)
    }

    pub fn unsupported_grant_type(description: &str) -> Self {
        Self::new("unsupported_grant_type", description)
    }

    pub fn invalid_scope(description: &str) -> Self {
        Self::new("invalid_scope", description)
    }

    pub fn server_error(description: &str) -> Self {
        Self::new("server_error", description)
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(d) => write!(f, "{}: {}", self.error, d),
            None => f.write_str(&self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// OAuth2 authorization server metadata (RFC 8414).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub token_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
}
