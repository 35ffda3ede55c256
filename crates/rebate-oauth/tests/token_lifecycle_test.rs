//! End-to-end token lifecycle against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use async_trait::async_trait;
use rebate_core::{
    AccessTokenRecord, AuthorizationCode, AuthorizationCodeRecord, Client, Clock,
    CodeChallengeMethod, Error, IntrospectionRequest, IssuedTokens, ManualClock,
    NewAuthorizationCode, NewClient, RefreshTokenRecord, RevocationRequest, TokenRequest,
    TokenResponse, User, UserRepository,
};
use rebate_crypto::{base64url_decode, base64url_encode, sha256_base64url, AppSecret};
use rebate_db::MemoryStore;
use rebate_oauth::{
    ClientCredentials, GrantError, OAuthConfig, OAuthModel, OAuthService, TokenEndpoint,
};

const REDIRECT: &str = "https://app.example/callback";
const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

struct Harness {
    service: Arc<OAuthService>,
    endpoint: TokenEndpoint,
    clock: ManualClock,
    user: User,
}

async fn harness() -> Harness {
    let store = MemoryStore::new();
    // Whole seconds, so expires_in comes out exact.
    let start = Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap();
    let clock = ManualClock::new(start);
    let service = Arc::new(
        OAuthService::new(
            Arc::new(store.clone()),
            AppSecret::generate(),
            OAuthConfig::default(),
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );
    service
        .register_client(NewClient::confidential("C1", "S1", REDIRECT))
        .await
        .unwrap();
    service
        .register_client(NewClient::confidential("C2", "S2", REDIRECT))
        .await
        .unwrap();
    service
        .register_client(NewClient::public("P1", REDIRECT))
        .await
        .unwrap();

    let user = User {
        id: Uuid::now_v7(),
        email: "u1@example.com".into(),
        created_at: clock.now(),
    };
    store.insert_user(&user).await.unwrap();

    let endpoint = TokenEndpoint::new(
        service.clone(),
        Arc::new(clock.clone()),
        OAuthConfig::default().issuer,
    );
    Harness {
        service,
        endpoint,
        clock,
        user,
    }
}

fn creds(id: &str, secret: Option<&str>) -> ClientCredentials {
    ClientCredentials {
        client_id: Some(id.into()),
        client_secret: secret.map(String::from),
    }
}

fn c1() -> ClientCredentials {
    creds("C1", Some("S1"))
}

fn error_code<T: std::fmt::Debug>(result: Result<T, GrantError>) -> String {
    match result {
        Err(GrantError::Protocol(e)) => e.error,
        other => panic!("expected protocol error, got {:?}", other),
    }
}

impl Harness {
    async fn authorize(&self, client_id: &str, scope: &[&str]) -> String {
        let client = self
            .service
            .get_client(client_id, None)
            .await
            .unwrap()
            .unwrap();
        self.service
            .save_authorization_code(
                NewAuthorizationCode {
                    redirect_uri: REDIRECT.into(),
                    scope: scope.iter().map(|s| s.to_string()).collect(),
                    code_challenge: sha256_base64url(VERIFIER.as_bytes()),
                    code_challenge_method: CodeChallengeMethod::S256,
                },
                &client,
                &self.user,
            )
            .await
            .unwrap()
            .id
    }

    fn code_request(code: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".into(),
            code: Some(code.into()),
            redirect_uri: Some(REDIRECT.into()),
            code_verifier: Some(VERIFIER.into()),
            ..Default::default()
        }
    }

    fn refresh_request(refresh_token: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "refresh_token".into(),
            refresh_token: Some(refresh_token.into()),
            ..Default::default()
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GrantError> {
        self.endpoint.token(&Self::code_request(code), &c1()).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GrantError> {
        self.endpoint
            .token(&Self::refresh_request(refresh_token), &c1())
            .await
    }

    async fn authenticates(&self, access_token: &str) -> bool {
        self.service
            .get_access_token(access_token)
            .await
            .unwrap()
            .is_some()
    }
}

// ─── Authorization code grant ──────────────────────────────────────────────

#[tokio::test]
async fn test_pkce_exchange_authenticates_as_user() {
    let h = harness().await;
    let code = h.authorize("C1", &["read", "offers"]).await;

    let response = h.exchange_code(&code).await.unwrap();
    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 3600);
    assert_eq!(response.scope.as_deref(), Some("read offers"));
    assert!(response.refresh_token.is_some());

    let record = h
        .service
        .get_access_token(&response.access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.user.id, h.user.id);
    assert_eq!(record.client.id, "C1");
}

#[tokio::test]
async fn test_code_exchanged_twice_succeeds_once() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    assert!(h.exchange_code(&code).await.is_ok());
    assert_eq!(error_code(h.exchange_code(&code).await), "invalid_grant");
}

#[tokio::test]
async fn test_concurrent_code_exchange_has_one_winner() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let (a, b) = futures::join!(h.exchange_code(&code), h.exchange_code(&code));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
}

#[tokio::test]
async fn test_code_past_ten_minutes_rejected_unused() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
    assert_eq!(error_code(h.exchange_code(&code).await), "invalid_grant");
}

#[tokio::test]
async fn test_code_past_ten_minutes_rejected_after_use() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    assert!(h.exchange_code(&code).await.is_ok());
    h.clock.advance(Duration::minutes(11));
    assert_eq!(error_code(h.exchange_code(&code).await), "invalid_grant");
}

#[tokio::test]
async fn test_code_expiring_after_lookup_cannot_be_consumed() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    assert!(h.service.get_authorization_code(&code).await.unwrap().is_some());

    h.clock.advance(Duration::minutes(11));
    assert!(!h.service.revoke_authorization_code(&code).await.unwrap());
}

#[tokio::test]
async fn test_code_just_inside_lifetime_accepted() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    h.clock.advance(Duration::minutes(10) - Duration::seconds(1));
    assert!(h.exchange_code(&code).await.is_ok());
}

#[tokio::test]
async fn test_wrong_verifier_does_not_burn_code() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let mut request = Harness::code_request(&code);
    request.code_verifier = Some("x".repeat(43));
    assert_eq!(
        error_code(h.endpoint.token(&request, &c1()).await),
        "invalid_grant"
    );
    assert!(h.exchange_code(&code).await.is_ok());
}

#[tokio::test]
async fn test_redirect_uri_must_match_exactly() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let mut request = Harness::code_request(&code);
    request.redirect_uri = Some(format!("{}/", REDIRECT));
    assert_eq!(
        error_code(h.endpoint.token(&request, &c1()).await),
        "invalid_grant"
    );
}

#[tokio::test]
async fn test_code_bound_to_issuing_client() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let result = h
        .endpoint
        .token(&Harness::code_request(&code), &creds("C2", Some("S2")))
        .await;
    assert_eq!(error_code(result), "invalid_grant");
}

#[tokio::test]
async fn test_missing_verifier_is_invalid_request() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let mut request = Harness::code_request(&code);
    request.code_verifier = None;
    assert_eq!(
        error_code(h.endpoint.token(&request, &c1()).await),
        "invalid_request"
    );
}

#[tokio::test]
async fn test_public_client_exchanges_without_secret() {
    let h = harness().await;
    let code = h.authorize("P1", &["read"]).await;
    let response = h
        .endpoint
        .token(&Harness::code_request(&code), &creds("P1", None))
        .await
        .unwrap();
    assert!(h.authenticates(&response.access_token).await);
}

// ─── Client authentication ─────────────────────────────────────────────────

#[tokio::test]
async fn test_wrong_secret_is_not_found() {
    let h = harness().await;
    assert!(h.service.get_client("C1", Some("S2")).await.unwrap().is_none());
    assert!(h.service.get_client("C1", Some("S1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_wrong_secret_is_invalid_client() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let result = h
        .endpoint
        .token(&Harness::code_request(&code), &creds("C1", Some("nope")))
        .await;
    assert_eq!(error_code(result), "invalid_client");
}

#[tokio::test]
async fn test_confidential_client_without_secret_is_invalid_client() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let result = h
        .endpoint
        .token(&Harness::code_request(&code), &creds("C1", None))
        .await;
    assert_eq!(error_code(result), "invalid_client");
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let h = harness().await;
    let request = TokenRequest {
        grant_type: "client_credentials".into(),
        ..Default::default()
    };
    assert_eq!(
        error_code(h.endpoint.token(&request, &c1()).await),
        "unsupported_grant_type"
    );
}

// ─── Issuance and verification ─────────────────────────────────────────────

#[tokio::test]
async fn test_mint_then_verify_preserves_user_and_scope() {
    let h = harness().await;
    let client = h.service.get_client("C1", Some("S1")).await.unwrap().unwrap();
    for scope in [vec![], vec!["read".to_string()], vec!["a".into(), "b".into(), "c".into()]] {
        let tokens = h.service.mint(&client, &h.user, &scope, true).await.unwrap();
        let record = h
            .service
            .get_access_token(&tokens.access_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.user.id, h.user.id);
        assert_eq!(record.access_token.scope, scope);
    }
}

#[tokio::test]
async fn test_tampered_subject_fails_signature() {
    let h = harness().await;
    let client = h.service.get_client("C1", Some("S1")).await.unwrap().unwrap();
    let tokens = h.service.mint(&client, &h.user, &[], false).await.unwrap();

    let parts: Vec<&str> = tokens.access_token.split('.').collect();
    let mut payload: serde_json::Value =
        serde_json::from_slice(&base64url_decode(parts[1]).unwrap()).unwrap();
    payload["sub"] = serde_json::json!(Uuid::now_v7().to_string());
    let forged = format!(
        "{}.{}.{}",
        parts[0],
        base64url_encode(&serde_json::to_vec(&payload).unwrap()),
        parts[2]
    );

    assert!(matches!(
        h.service.get_access_token(&forged).await,
        Err(Error::SignatureInvalid(_))
    ));
    // The genuine token is unaffected.
    assert!(h.authenticates(&tokens.access_token).await);
}

#[tokio::test]
async fn test_access_token_expires_on_clock() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let response = h.exchange_code(&code).await.unwrap();
    h.clock.advance(Duration::seconds(3599));
    assert!(h.authenticates(&response.access_token).await);
    h.clock.advance(Duration::seconds(1));
    assert!(!h.authenticates(&response.access_token).await);
}

// ─── Refresh rotation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_rotates_to_new_pair() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let b = h.refresh(a.refresh_token.as_deref().unwrap()).await.unwrap();

    assert_ne!(a.access_token, b.access_token);
    assert_ne!(a.refresh_token, b.refresh_token);
    assert!(!h.authenticates(&a.access_token).await);
    assert!(h.authenticates(&b.access_token).await);
    assert_eq!(b.scope.as_deref(), Some("read"));
}

#[tokio::test]
async fn test_refresh_replay_revokes_the_whole_chain() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let a_refresh = a.refresh_token.clone().unwrap();
    let b = h.refresh(&a_refresh).await.unwrap();

    assert_eq!(error_code(h.refresh(&a_refresh).await), "invalid_grant");

    assert!(!h.authenticates(&b.access_token).await);
    assert_eq!(
        error_code(h.refresh(b.refresh_token.as_deref().unwrap()).await),
        "invalid_grant"
    );
}

#[tokio::test]
async fn test_revoked_pair_cannot_authenticate_or_mint() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let blob = a.refresh_token.clone().unwrap();

    let record = h.service.get_refresh_token(&blob).await.unwrap().unwrap();
    assert!(h.service.revoke_token(&record).await.unwrap());

    assert!(!h.authenticates(&a.access_token).await);
    assert_eq!(error_code(h.refresh(&blob).await), "invalid_grant");
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let blob = a.refresh_token.unwrap();
    let (x, y) = futures::join!(h.refresh(&blob), h.refresh(&blob));
    assert_eq!([x.is_ok(), y.is_ok()].iter().filter(|ok| **ok).count(), 1);
}

/// Lands a replay of the presented refresh token right after this request
/// wins the rotation, before its new pair is saved.
struct ReplayAfterRotation {
    inner: Arc<OAuthService>,
}

#[async_trait]
impl OAuthModel for ReplayAfterRotation {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> rebate_core::Result<Option<Client>> {
        self.inner.get_client(client_id, client_secret).await
    }

    async fn validate_redirect_uri(
        &self,
        client: &Client,
        redirect_uri: &str,
    ) -> rebate_core::Result<bool> {
        self.inner.validate_redirect_uri(client, redirect_uri).await
    }

    async fn save_authorization_code(
        &self,
        code: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> rebate_core::Result<AuthorizationCode> {
        self.inner.save_authorization_code(code, client, user).await
    }

    async fn get_authorization_code(
        &self,
        code: &str,
    ) -> rebate_core::Result<Option<AuthorizationCodeRecord>> {
        self.inner.get_authorization_code(code).await
    }

    async fn revoke_authorization_code(&self, code: &str) -> rebate_core::Result<bool> {
        self.inner.revoke_authorization_code(code).await
    }

    async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> rebate_core::Result<String> {
        self.inner.generate_access_token(client, user, scope).await
    }

    async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &User,
        scope: &[String],
    ) -> rebate_core::Result<String> {
        self.inner.generate_refresh_token(client, user, scope).await
    }

    async fn save_token(
        &self,
        tokens: IssuedTokens,
        client: &Client,
        user: &User,
    ) -> rebate_core::Result<IssuedTokens> {
        self.inner.save_token(tokens, client, user).await
    }

    async fn get_access_token(
        &self,
        token: &str,
    ) -> rebate_core::Result<Option<AccessTokenRecord>> {
        self.inner.get_access_token(token).await
    }

    async fn get_refresh_token(
        &self,
        token: &str,
    ) -> rebate_core::Result<Option<RefreshTokenRecord>> {
        self.inner.get_refresh_token(token).await
    }

    async fn revoke_token(&self, record: &RefreshTokenRecord) -> rebate_core::Result<bool> {
        let won = self.inner.revoke_token(record).await?;
        if won {
            assert!(!self.inner.revoke_token(record).await?);
        }
        Ok(won)
    }

    async fn revoke_token_pair(&self, record: &RefreshTokenRecord) -> rebate_core::Result<bool> {
        self.inner.revoke_token_pair(record).await
    }
}

#[tokio::test]
async fn test_rotation_winner_gets_nothing_when_replay_lands_before_save() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();

    let racing = TokenEndpoint::new(
        Arc::new(ReplayAfterRotation {
            inner: h.service.clone(),
        }),
        Arc::new(h.clock.clone()),
        OAuthConfig::default().issuer,
    );
    let result = racing
        .token(&Harness::refresh_request(a.refresh_token.as_deref().unwrap()), &c1())
        .await;
    assert_eq!(error_code(result), "invalid_grant");
    assert!(!h.authenticates(&a.access_token).await);
}

#[tokio::test]
async fn test_pair_saved_after_replay_cascade_never_authenticates() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let record = h
        .service
        .get_refresh_token(a.refresh_token.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();

    // Winner rotates, loser replays and cascades, then the winner saves.
    assert!(h.service.revoke_token(&record).await.unwrap());
    assert!(!h.service.revoke_token(&record).await.unwrap());

    let client = record.client.clone();
    let scope = record.access_token.scope.clone();
    let access_token = h
        .service
        .generate_access_token(&client, &record.user, &scope)
        .await
        .unwrap();
    let refresh_token = h
        .service
        .generate_refresh_token(&client, &record.user, &scope)
        .await
        .unwrap();
    let saved = h
        .service
        .save_token(
            IssuedTokens {
                access_token: access_token.clone(),
                access_token_expires_at: h.clock.now(),
                refresh_token: Some(refresh_token.clone()),
                refresh_token_expires_at: None,
                scope,
                rotated_from: Some(record.refresh_token.id.clone()),
            },
            &client,
            &record.user,
        )
        .await;
    assert!(matches!(saved, Err(Error::Revoked(_))));
    assert!(!h.authenticates(&access_token).await);
    assert!(h.service.get_refresh_token(&refresh_token).await.unwrap().is_none());

    // The user can still sign in again afterwards.
    h.clock.advance(Duration::seconds(1));
    let fresh = h.exchange_code(&h.authorize("C1", &["read"]).await).await.unwrap();
    let next = h.refresh(fresh.refresh_token.as_deref().unwrap()).await.unwrap();
    assert!(h.authenticates(&next.access_token).await);
}

#[tokio::test]
async fn test_rotated_token_replayed_by_other_client_still_cascades() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let a_refresh = a.refresh_token.clone().unwrap();
    let b = h.refresh(&a_refresh).await.unwrap();

    let replay = Harness::refresh_request(&a_refresh);
    assert_eq!(
        error_code(h.endpoint.token(&replay, &creds("C2", Some("S2"))).await),
        "invalid_grant"
    );
    assert!(!h.authenticates(&b.access_token).await);
}

#[tokio::test]
async fn test_refresh_may_narrow_but_not_widen_scope() {
    let h = harness().await;
    let code = h.authorize("C1", &["read", "write"]).await;
    let a = h.exchange_code(&code).await.unwrap();

    let mut widen = Harness::refresh_request(a.refresh_token.as_deref().unwrap());
    widen.scope = Some("read admin".into());
    assert_eq!(
        error_code(h.endpoint.token(&widen, &c1()).await),
        "invalid_scope"
    );

    // The denied request did not consume the token.
    let mut narrow = Harness::refresh_request(a.refresh_token.as_deref().unwrap());
    narrow.scope = Some("read".into());
    let b = h.endpoint.token(&narrow, &c1()).await.unwrap();
    assert_eq!(b.scope.as_deref(), Some("read"));
}

#[tokio::test]
async fn test_refresh_bound_to_issuing_client() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let request = Harness::refresh_request(a.refresh_token.as_deref().unwrap());
    assert_eq!(
        error_code(h.endpoint.token(&request, &creds("C2", Some("S2"))).await),
        "invalid_grant"
    );
    assert!(h.authenticates(&a.access_token).await);
}

#[tokio::test]
async fn test_refresh_blob_bit_flips_are_not_found() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let blob = a.refresh_token.unwrap();
    let raw = base64url_decode(&blob).unwrap();

    for byte in 0..raw.len() {
        for bit in 0..8 {
            let mut tampered = raw.clone();
            tampered[byte] ^= 1 << bit;
            let forged = base64url_encode(&tampered);
            assert!(h.service.get_refresh_token(&forged).await.unwrap().is_none());
        }
    }
    assert!(h.service.get_refresh_token(&blob).await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_refresh_token_rejected() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    h.clock.advance(Duration::days(30) + Duration::seconds(1));
    assert_eq!(
        error_code(h.refresh(a.refresh_token.as_deref().unwrap()).await),
        "invalid_grant"
    );
}

// ─── Revocation and introspection ──────────────────────────────────────────

#[tokio::test]
async fn test_revocation_endpoint_kills_pair() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let request = RevocationRequest {
        token: a.refresh_token.clone().unwrap(),
        ..Default::default()
    };

    h.endpoint.revoke(&request, &c1()).await.unwrap();
    assert!(!h.authenticates(&a.access_token).await);
    // Repeat and unknown tokens are still success.
    h.endpoint.revoke(&request, &c1()).await.unwrap();
    let unknown = RevocationRequest {
        token: "unknown".into(),
        ..Default::default()
    };
    h.endpoint.revoke(&unknown, &c1()).await.unwrap();
}

#[tokio::test]
async fn test_revocation_by_other_client_is_ignored() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let request = RevocationRequest {
        token: a.refresh_token.clone().unwrap(),
        ..Default::default()
    };
    h.endpoint
        .revoke(&request, &creds("C2", Some("S2")))
        .await
        .unwrap();
    assert!(h.authenticates(&a.access_token).await);
}

#[tokio::test]
async fn test_introspection() {
    let h = harness().await;
    let code = h.authorize("C1", &["read"]).await;
    let a = h.exchange_code(&code).await.unwrap();
    let request = IntrospectionRequest {
        token: a.access_token.clone(),
        ..Default::default()
    };

    let active = h.endpoint.introspect(&request, &c1()).await.unwrap();
    assert!(active.active);
    assert_eq!(active.sub, Some(h.user.id.to_string()));
    assert_eq!(active.client_id.as_deref(), Some("C1"));
    assert_eq!(active.scope.as_deref(), Some("read"));

    let foreign = h
        .endpoint
        .introspect(&request, &creds("C2", Some("S2")))
        .await
        .unwrap();
    assert!(!foreign.active);
    assert!(foreign.sub.is_none());

    let refresh = IntrospectionRequest {
        token: a.refresh_token.clone().unwrap(),
        token_type_hint: Some("refresh_token".into()),
        ..Default::default()
    };
    let active_refresh = h.endpoint.introspect(&refresh, &c1()).await.unwrap();
    assert_eq!(active_refresh.token_type.as_deref(), Some("refresh_token"));

    h.refresh(a.refresh_token.as_deref().unwrap()).await.unwrap();
    assert!(!h.endpoint.introspect(&request, &c1()).await.unwrap().active);
    assert!(!h.endpoint.introspect(&refresh, &c1()).await.unwrap().active);
}

#[tokio::test]
async fn test_introspection_requires_confidential_client() {
    let h = harness().await;
    let request = IntrospectionRequest {
        token: "whatever".into(),
        ..Default::default()
    };
    assert_eq!(
        error_code(h.endpoint.introspect(&request, &creds("P1", None)).await),
        "invalid_client"
    );
}
