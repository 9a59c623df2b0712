// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! ## Verification order
//!
//! 1. JWKS (`AUTH_JWKS_URL`): RS*/ES* signature against the issuer's keys
//! 2. Shared secret (`AUTH_JWT_SECRET`): HS256
//! 3. `dev` feature only: structure check without signature verification
//!
//! With none of these available every request is rejected with
//! `internal_error`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::{AuthError, AuthenticatedUser, Role, SessionClaims};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config).await?;

        // Later extractors in the same request reuse the verified identity.
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Verify a bearer token with the first configured verifier.
pub async fn verify_jwt(
    token: &str,
    config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    if let Some(jwks) = &config.jwks {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let (key, algorithm) = match &header.kid {
            Some(kid) => jwks.get_decoding_key(kid).await?,
            None => jwks.get_any_decoding_key().await?,
        };
        return verify_signed(token, &key, algorithm, config);
    }

    if let Some(secret) = config.jwt_secret.as_deref() {
        let key = DecodingKey::from_secret(secret.as_bytes());
        return verify_signed(token, &key, Algorithm::HS256, config);
    }

    verify_unconfigured(token)
}

#[cfg(not(feature = "dev"))]
fn verify_unconfigured(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::InternalError(
        "no token verifier configured".to_string(),
    ))
}

fn verify_signed(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
    config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let data = decode::<SessionClaims>(token, key, &validation)?;
    Ok(AuthenticatedUser::from_claims(data.claims))
}

/// Development decoding without signature verification.
///
/// WARNING: only compiled with the `dev` feature.
#[cfg(feature = "dev")]
fn verify_unconfigured(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<SessionClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let now = chrono::Utc::now().timestamp();
    if data.claims.exp > 0 && data.claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    tracing::warn!(user_id = %data.claims.sub, "Accepted unsigned development token");
    Ok(AuthenticatedUser::from_claims(data.claims))
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

/// Extractor for audit readers: admins and auditors.
pub struct AuditReader(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AuditReader {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_role(Role::Auditor) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AuditReader(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{sign_token, sign_token_with, TestApp, TEST_JWT_SECRET};
    use axum::http::Request;
    use serde_json::json;

    fn parts_with_token(token: &str) -> Parts {
        Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn bare_parts() -> Parts {
        Request::builder().uri("/test").body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let app = TestApp::new();
        let mut parts = bare_parts();

        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let app = TestApp::new();
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn hs256_token_is_accepted() {
        let app = TestApp::new();
        let mut parts = parts_with_token(&sign_token("user_123", None));

        let Auth(user) = Auth::from_request_parts(&mut parts, &app.state).await.unwrap();
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Member);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_signature() {
        let app = TestApp::new();
        let token = sign_token_with(
            b"not-the-project-secret",
            json!({ "sub": "user_123", "exp": chrono::Utc::now().timestamp() + 600 }),
        );
        let mut parts = parts_with_token(&token);

        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = TestApp::new();
        let token = sign_token_with(
            TEST_JWT_SECRET.as_bytes(),
            json!({ "sub": "user_123", "exp": chrono::Utc::now().timestamp() - 3600 }),
        );
        let mut parts = parts_with_token(&token);

        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let mut app = TestApp::new();
        app.state.auth_config.issuer = Some("https://project.supabase.co/auth/v1".to_string());

        let mut parts = parts_with_token(&sign_token("user_123", None));
        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[cfg(not(feature = "dev"))]
    #[tokio::test]
    async fn no_verifier_is_internal_error() {
        let mut app = TestApp::new();
        app.state.auth_config.jwt_secret = None;

        let mut parts = parts_with_token(&sign_token("user_123", None));
        let result = Auth::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::InternalError(_))));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let app = TestApp::new();
        let mut parts = bare_parts();
        parts.extensions.insert(AuthenticatedUser {
            user_id: "user_from_layer".to_string(),
            role: Role::Admin,
            session_id: None,
            issuer: "layer".to_string(),
            expires_at: 0,
        });

        let Auth(user) = Auth::from_request_parts(&mut parts, &app.state).await.unwrap();
        assert_eq!(user.user_id, "user_from_layer");
    }

    #[tokio::test]
    async fn admin_only_rejects_member() {
        let app = TestApp::new();
        let mut parts = parts_with_token(&sign_token("user_123", None));

        let result = AdminOnly::from_request_parts(&mut parts, &app.state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn audit_reader_accepts_auditor_and_admin() {
        let app = TestApp::new();

        let mut parts = parts_with_token(&sign_token("aud_1", Some("auditor")));
        assert!(AuditReader::from_request_parts(&mut parts, &app.state).await.is_ok());

        let mut parts = parts_with_token(&sign_token("adm_1", Some("admin")));
        assert!(AuditReader::from_request_parts(&mut parts, &app.state).await.is_ok());

        let mut parts = parts_with_token(&sign_token("mem_1", None));
        assert!(matches!(
            AuditReader::from_request_parts(&mut parts, &app.state).await,
            Err(AuthError::InsufficientPermissions)
        ));
    }
}
