//! # rebate-api
//!
//! HTTP surface for the rebate token lifecycle: the OAuth2 token, revocation,
//! introspection, and discovery endpoints, plus bearer-protected resources.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use rebate_oauth::{OAuthService, TokenEndpoint};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OAuthService>,
    pub endpoint: TokenEndpoint,
    /// Public base URL of this server.
    pub issuer_url: String,
}

impl AppState {
    pub fn new(service: Arc<OAuthService>, issuer_url: impl Into<String>) -> Self {
        let endpoint = TokenEndpoint::new(
            service.clone(),
            service.clock(),
            service.config().issuer.clone(),
        );
        Self {
            service,
            endpoint,
            issuer_url: issuer_url.into(),
        }
    }
}

/// Time-ordered UUIDv7 request correlation ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::resources::health_check))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::oauth::discovery),
        )
        .route("/oauth/token", post(handlers::oauth::token))
        .route("/oauth/revoke", post(handlers::oauth::revoke))
        .route("/oauth/introspect", post(handlers::oauth::introspect))
        .route("/api/v1/me", get(handlers::resources::me))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

/// Run `cleanup_expired` every `interval`, starting immediately.
pub fn spawn_cleanup_task(service: Arc<OAuthService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service.cleanup_expired().await {
                Ok(counts) if counts.total() > 0 => info!(
                    subsystem = "api",
                    component = "cleanup",
                    removed = counts.total(),
                    "Cleanup pass complete"
                ),
                Ok(_) => {}
                Err(e) => error!(
                    subsystem = "api",
                    component = "cleanup",
                    error = %e,
                    "Cleanup pass failed"
                ),
            }
        }
    })
}
