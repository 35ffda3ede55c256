//! PostgreSQL implementation of the OAuth storage traits.
//!
//! One store type backs all four repositories; the trait impls live in
//! `clients`, `users`, `authorization_codes`, and `tokens`. This module holds
//! the shared column lists and row mappers for the joined read models.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::warn;

use rebate_core::{
    AccessToken, AuthorizationCode, Client, CodeChallengeMethod, Error, GrantType, RefreshToken,
    Result, StoredClient, User,
};

/// PostgreSQL-backed store for clients, users, codes, and token pairs.
#[derive(Clone)]
pub struct PgOAuthStore {
    pub(crate) pool: Pool<Postgres>,
}

impl PgOAuthStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) const CLIENT_COLUMNS: &str = "c.id AS c_id, c.name AS c_name, \
     c.secret_hash AS c_secret_hash, c.redirect_uris AS c_redirect_uris, \
     c.grants AS c_grants, c.user_id AS c_user_id, \
     c.access_token_lifetime_secs AS c_access_lifetime, \
     c.refresh_token_lifetime_secs AS c_refresh_lifetime";

pub(crate) const USER_COLUMNS: &str =
    "u.id AS u_id, u.email AS u_email, u.created_at AS u_created_at";

pub(crate) const ACCESS_COLUMNS: &str = "at.id AS at_id, at.user_id AS at_user_id, \
     at.client_id AS at_client_id, at.scope AS at_scope, at.revoked AS at_revoked, \
     at.expires_at AS at_expires_at, at.created_at AS at_created_at";

pub(crate) const REFRESH_COLUMNS: &str = "rt.id AS rt_id, \
     rt.access_token_id AS rt_access_token_id, rt.revoked AS rt_revoked, \
     rt.expires_at AS rt_expires_at, rt.created_at AS rt_created_at";

pub(crate) const CODE_COLUMNS: &str = "ac.id AS ac_id, ac.client_id AS ac_client_id, \
     ac.user_id AS ac_user_id, ac.redirect_uri AS ac_redirect_uri, ac.scope AS ac_scope, \
     ac.code_challenge AS ac_code_challenge, \
     ac.code_challenge_method AS ac_code_challenge_method, \
     ac.expires_at AS ac_expires_at, ac.revoked AS ac_revoked, ac.created_at AS ac_created_at";

pub(crate) fn stored_client_from_row(row: &PgRow) -> StoredClient {
    let secret_hash: Option<String> = row.get("c_secret_hash");
    let grants: Vec<String> = row.get("c_grants");
    let id: String = row.get("c_id");

    let grants = grants
        .iter()
        .filter_map(|g| match g.parse::<GrantType>() {
            Ok(grant) => Some(grant),
            Err(_) => {
                warn!(
                    subsystem = "db",
                    component = "clients",
                    client_id = %id,
                    grant = %g,
                    "Ignoring unknown grant on client"
                );
                None
            }
        })
        .collect();

    StoredClient {
        client: Client {
            id,
            name: row.get("c_name"),
            redirect_uris: row.get("c_redirect_uris"),
            grants,
            user_id: row.get("c_user_id"),
            is_confidential: secret_hash.is_some(),
            access_token_lifetime_secs: row.get("c_access_lifetime"),
            refresh_token_lifetime_secs: row.get("c_refresh_lifetime"),
        },
        secret_hash,
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("u_id"),
        email: row.get("u_email"),
        created_at: row.get("u_created_at"),
    }
}

pub(crate) fn access_token_from_row(row: &PgRow) -> AccessToken {
    AccessToken {
        id: row.get("at_id"),
        user_id: row.get("at_user_id"),
        client_id: row.get("at_client_id"),
        scope: row.get("at_scope"),
        revoked: row.get("at_revoked"),
        expires_at: row.get("at_expires_at"),
        created_at: row.get("at_created_at"),
    }
}

/// Maps the `rt_*` columns; `None` when a LEFT JOIN found no refresh token.
pub(crate) fn refresh_token_from_row(row: &PgRow) -> Option<RefreshToken> {
    let id: Option<String> = row.get("rt_id");
    Some(RefreshToken {
        id: id?,
        access_token_id: row.get("rt_access_token_id"),
        revoked: row.get("rt_revoked"),
        expires_at: row.get("rt_expires_at"),
        created_at: row.get("rt_created_at"),
    })
}

pub(crate) fn code_from_row(row: &PgRow) -> Result<AuthorizationCode> {
    let method: String = row.get("ac_code_challenge_method");
    let code_challenge_method = method
        .parse::<CodeChallengeMethod>()
        .map_err(|e| Error::Internal(format!("corrupt authorization code row: {}", e)))?;

    Ok(AuthorizationCode {
        id: row.get("ac_id"),
        client_id: row.get("ac_client_id"),
        user_id: row.get("ac_user_id"),
        redirect_uri: row.get("ac_redirect_uri"),
        scope: row.get("ac_scope"),
        code_challenge: row.get("ac_code_challenge"),
        code_challenge_method,
        expires_at: row.get("ac_expires_at"),
        revoked: row.get("ac_revoked"),
        created_at: row.get("ac_created_at"),
    })
}

/// Whether a rotated pair must be refused.
///
/// A missing parent counts as revoked. Otherwise the pair is blocked when the
/// user's revocation watermark is at or after the parent's issue time.
pub(crate) fn lineage_revoked(
    watermark: Option<DateTime<Utc>>,
    parent_created_at: Option<DateTime<Utc>>,
) -> bool {
    match (watermark, parent_created_at) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(revoked_at), Some(issued_at)) => revoked_at >= issued_at,
    }
}
