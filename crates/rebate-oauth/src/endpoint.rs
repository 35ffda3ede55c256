//! Token endpoint protocol logic (RFC 6749 §4.1.3, §6; RFC 7009; RFC 7662).
//!
//! Drives an [`OAuthModel`] for the `authorization_code` and `refresh_token`
//! grants. Every denial surfaces as a generic RFC 6749 error; the internal
//! reason only reaches the logs.

use std::sync::Arc;

use tracing::{debug, warn};

use rebate_core::defaults::TOKEN_TYPE_BEARER;
use rebate_core::{
    join_scope, parse_scope, Client, Clock, Error, GrantType, IntrospectionRequest, IssuedTokens,
    OAuthError, RevocationRequest, TokenIntrospectionResponse, TokenRequest, TokenResponse, User,
};

use crate::model::OAuthModel;
use crate::pkce::verify_code_verifier;

/// Client credentials from a Basic header or the request body.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Why a grant was not honoured.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    /// An RFC 6749 §5.2 error for the client.
    #[error("{0}")]
    Protocol(OAuthError),

    /// Infrastructure failure; the client sees `server_error`.
    #[error(transparent)]
    Server(#[from] Error),
}

impl From<OAuthError> for GrantError {
    fn from(err: OAuthError) -> Self {
        GrantError::Protocol(err)
    }
}

impl GrantError {
    /// The body to send back.
    pub fn to_oauth_error(&self) -> OAuthError {
        match self {
            GrantError::Protocol(err) => err.clone(),
            GrantError::Server(_) => OAuthError::server_error("internal error"),
        }
    }
}

type GrantResult<T> = std::result::Result<T, GrantError>;

fn invalid_grant() -> GrantError {
    OAuthError::invalid_grant("grant is invalid, expired, or revoked").into()
}

#[derive(Clone)]
pub struct TokenEndpoint {
    model: Arc<dyn OAuthModel>,
    clock: Arc<dyn Clock>,
    issuer: String,
}

impl TokenEndpoint {
    pub fn new(
        model: Arc<dyn OAuthModel>,
        clock: Arc<dyn Clock>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            model,
            clock,
            issuer: issuer.into(),
        }
    }

    /// Authenticate the calling client. Confidential clients must present their secret.
    pub async fn authenticate_client(&self, credentials: &ClientCredentials) -> GrantResult<Client> {
        let denied = || OAuthError::invalid_client("client authentication failed");

        let client_id = credentials
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(denied)?;

        let client = self
            .model
            .get_client(client_id, credentials.client_secret.as_deref())
            .await?
            .ok_or_else(denied)?;

        if client.is_confidential && credentials.client_secret.is_none() {
            debug!(
                subsystem = "oauth",
                component = "endpoint",
                client_id,
                reason = "missing_secret",
                "Client authentication failed"
            );
            return Err(denied().into());
        }
        Ok(client)
    }

    /// Handle a token request.
    pub async fn token(
        &self,
        request: &TokenRequest,
        credentials: &ClientCredentials,
    ) -> GrantResult<TokenResponse> {
        let grant = match request.grant_type.parse::<GrantType>() {
            Ok(grant @ (GrantType::AuthorizationCode | GrantType::RefreshToken)) => grant,
            _ => {
                return Err(OAuthError::unsupported_grant_type(
                    "only authorization_code and refresh_token are supported",
                )
                .into())
            }
        };

        let client = self.authenticate_client(credentials).await?;
        if !client.allows_grant(grant) {
            return Err(
                OAuthError::unauthorized_client("client is not allowed this grant type").into(),
            );
        }

        let tokens = match grant {
            GrantType::AuthorizationCode => self.exchange_code(request, &client).await?,
            _ => self.exchange_refresh_token(request, &client).await?,
        };
        Ok(tokens.to_response(self.clock.now()))
    }

    async fn exchange_code(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> GrantResult<IssuedTokens> {
        let code = required(&request.code, "code")?;
        let redirect_uri = required(&request.redirect_uri, "redirect_uri")?;
        let verifier = required(&request.code_verifier, "code_verifier")?;

        let Some(record) = self.model.get_authorization_code(code).await? else {
            return Err(invalid_grant());
        };

        let reason = if record.client.id != client.id {
            Some("client_mismatch")
        } else if record.code.redirect_uri != redirect_uri
            || !self.model.validate_redirect_uri(client, redirect_uri).await?
        {
            Some("redirect_mismatch")
        } else if !verify_code_verifier(
            verifier,
            &record.code.code_challenge,
            record.code.code_challenge_method,
        ) {
            Some("pkce_mismatch")
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!(
                subsystem = "oauth",
                component = "endpoint",
                grant_type = "authorization_code",
                client_id = %client.id,
                reason,
                "Grant denied"
            );
            return Err(invalid_grant());
        }

        if !self.model.revoke_authorization_code(code).await? {
            return Err(invalid_grant());
        }

        let with_refresh = client.allows_grant(GrantType::RefreshToken);
        self.issue(client, &record.user, &record.code.scope, with_refresh, None)
            .await
    }

    async fn exchange_refresh_token(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> GrantResult<IssuedTokens> {
        let blob = required(&request.refresh_token, "refresh_token")?;

        let Some(record) = self.model.get_refresh_token(blob).await? else {
            return Err(invalid_grant());
        };

        // Replay of a rotated-out token, by any client: the hook revokes the
        // whole chain.
        if record.refresh_token.revoked {
            self.model.revoke_token(&record).await?;
            return Err(invalid_grant());
        }

        if record.client.id != client.id {
            debug!(
                subsystem = "oauth",
                component = "endpoint",
                grant_type = "refresh_token",
                client_id = %client.id,
                reason = "client_mismatch",
                "Grant denied"
            );
            return Err(invalid_grant());
        }

        let granted = &record.access_token.scope;
        let scope = match request.scope.as_deref() {
            Some(requested) => {
                let requested = parse_scope(requested);
                if !requested.iter().all(|s| granted.contains(s)) {
                    return Err(OAuthError::invalid_scope(
                        "requested scope exceeds the original grant",
                    )
                    .into());
                }
                requested
            }
            None => granted.clone(),
        };

        if !self.model.revoke_token(&record).await? {
            return Err(invalid_grant());
        }

        self.issue(
            client,
            &record.user,
            &scope,
            true,
            Some(record.refresh_token.id.clone()),
        )
        .await
    }

    async fn issue(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
        with_refresh: bool,
        rotated_from: Option<String>,
    ) -> GrantResult<IssuedTokens> {
        let access_token = self.model.generate_access_token(client, user, scope).await?;
        let refresh_token = if with_refresh {
            Some(self.model.generate_refresh_token(client, user, scope).await?)
        } else {
            None
        };
        let tokens = IssuedTokens {
            access_token,
            access_token_expires_at: self.clock.now(),
            refresh_token,
            refresh_token_expires_at: None,
            scope: scope.to_vec(),
            rotated_from,
        };
        match self.model.save_token(tokens, client, user).await {
            Ok(saved) => Ok(saved),
            // Reuse was detected while this rotation was in flight.
            Err(Error::Revoked(_)) => Err(invalid_grant()),
            Err(e) => Err(e.into()),
        }
    }

    /// RFC 7009 revocation of a refresh token's pair.
    ///
    /// Unknown, foreign, and already-revoked tokens succeed silently.
    pub async fn revoke(
        &self,
        request: &RevocationRequest,
        credentials: &ClientCredentials,
    ) -> GrantResult<()> {
        let client = self.authenticate_client(credentials).await?;

        if request.token_type_hint.as_deref() == Some("access_token") {
            debug!(
                subsystem = "oauth",
                component = "endpoint",
                op = "revoke",
                client_id = %client.id,
                "Access token revocation is not supported; ignoring"
            );
            return Ok(());
        }

        let Some(record) = self.model.get_refresh_token(&request.token).await? else {
            return Ok(());
        };
        if record.client.id != client.id {
            warn!(
                subsystem = "oauth",
                component = "endpoint",
                op = "revoke",
                client_id = %client.id,
                reason = "client_mismatch",
                "Revocation of another client's token ignored"
            );
            return Ok(());
        }
        if !record.refresh_token.revoked {
            self.model.revoke_token_pair(&record).await?;
        }
        Ok(())
    }

    /// RFC 7662 introspection. Confidential clients only; a client only
    /// learns about its own tokens.
    pub async fn introspect(
        &self,
        request: &IntrospectionRequest,
        credentials: &ClientCredentials,
    ) -> GrantResult<TokenIntrospectionResponse> {
        let client = self.authenticate_client(credentials).await?;
        if !client.is_confidential {
            return Err(
                OAuthError::invalid_client("introspection requires a confidential client").into(),
            );
        }

        let refresh_first = request.token_type_hint.as_deref() == Some("refresh_token");
        let response = if refresh_first {
            match self.introspect_refresh(&request.token, &client).await? {
                Some(r) => Some(r),
                None => self.introspect_access(&request.token, &client).await?,
            }
        } else {
            match self.introspect_access(&request.token, &client).await? {
                Some(r) => Some(r),
                None => self.introspect_refresh(&request.token, &client).await?,
            }
        };
        Ok(response.unwrap_or_else(TokenIntrospectionResponse::inactive))
    }

    async fn introspect_access(
        &self,
        token: &str,
        client: &Client,
    ) -> GrantResult<Option<TokenIntrospectionResponse>> {
        let record = match self.model.get_access_token(token).await {
            Ok(Some(record)) => record,
            Ok(None) | Err(Error::SignatureInvalid(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if record.client.id != client.id {
            return Ok(None);
        }
        Ok(Some(TokenIntrospectionResponse {
            active: true,
            scope: Some(join_scope(&record.access_token.scope)),
            client_id: Some(record.client.id.clone()),
            token_type: Some(TOKEN_TYPE_BEARER.to_string()),
            exp: Some(record.access_token.expires_at.timestamp()),
            iat: Some(record.access_token.created_at.timestamp()),
            sub: Some(record.user.id.to_string()),
            iss: Some(self.issuer.clone()),
            jti: Some(record.access_token.id.clone()),
        }))
    }

    async fn introspect_refresh(
        &self,
        token: &str,
        client: &Client,
    ) -> GrantResult<Option<TokenIntrospectionResponse>> {
        let Some(record) = self.model.get_refresh_token(token).await? else {
            return Ok(None);
        };
        if record.refresh_token.revoked || record.client.id != client.id {
            return Ok(None);
        }
        Ok(Some(TokenIntrospectionResponse {
            active: true,
            scope: Some(join_scope(&record.access_token.scope)),
            client_id: Some(record.client.id.clone()),
            token_type: Some("refresh_token".to_string()),
            exp: Some(record.refresh_token.expires_at.timestamp()),
            iat: Some(record.refresh_token.created_at.timestamp()),
            sub: Some(record.user.id.to_string()),
            iss: Some(self.issuer.clone()),
            jti: None,
        }))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> GrantResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(&format!("missing {}", name)).into())
}
