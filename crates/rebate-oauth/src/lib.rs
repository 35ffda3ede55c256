//! # rebate-oauth
//!
//! OAuth2 authorization and token lifecycle for rebate.
//!
//! - Authorization codes: single use, PKCE-bound, ten-minute lifetime
//! - Access tokens: HS256 JWTs signed with a per-client key derived from the
//!   application secret; only the metadata row is stored, keyed by `jti`
//! - Refresh tokens: random ids handed out as AES-256-GCM sealed blobs,
//!   rotated on every use, with replay revoking every credential of the user
//!
//! [`OAuthService`] implements the [`OAuthModel`] hooks over any
//! [`rebate_core::OAuthStore`]; [`TokenEndpoint`] drives those hooks for the
//! token, revocation, and introspection endpoints.

pub mod authorization_codes;
pub mod client_directory;
pub mod endpoint;
pub mod issuer;
pub mod jwt;
pub mod model;
pub mod pkce;
pub mod revocation;
pub mod rotator;
pub mod verifier;

pub use authorization_codes::AuthorizationCodeStore;
pub use client_directory::ClientDirectory;
pub use endpoint::{ClientCredentials, GrantError, TokenEndpoint};
pub use issuer::TokenIssuer;
pub use jwt::Claims;
pub use model::{OAuthConfig, OAuthModel, OAuthService};
pub use revocation::RevocationEngine;
pub use rotator::RefreshRotator;
pub use verifier::TokenVerifier;
