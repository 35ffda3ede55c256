use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::RequireAuth;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub client_id: String,
    pub scope: String,
}

/// GET /api/v1/me: who the bearer token belongs to.
pub async fn me(auth: RequireAuth) -> impl IntoResponse {
    Json(MeResponse {
        user_id: auth.principal.user_id,
        client_id: auth.principal.client_id.clone(),
        scope: rebate_core::join_scope(&auth.principal.scope),
    })
}
