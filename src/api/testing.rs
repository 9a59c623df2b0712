// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for handler and extractor tests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::custody::testing::ScriptedTransformer;
use crate::custody::DEFAULT_ORPHAN_GRACE_SECS;
use crate::state::{AppState, AuthConfig};
use crate::storage::StoragePaths;

pub const TEST_JWT_SECRET: &str = "test-project-secret-with-enough-entropy";
pub const TEST_ISSUER: &str = "https://test.local/auth/v1";

const BODY_LIMIT: usize = 16 * 1024 * 1024;

pub fn sign_token_with(secret: &[u8], claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap()
}

/// HS256 session token for `user_id`, optionally carrying an app role.
pub fn sign_token(user_id: &str, role: Option<&str>) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "sub": user_id,
        "exp": now + 600,
        "iat": now,
        "iss": TEST_ISSUER,
        "aud": "authenticated",
        "session_id": format!("session-{user_id}"),
    });
    if let Some(role) = role {
        claims["app_metadata"] = json!({ "role": role });
    }
    sign_token_with(TEST_JWT_SECRET.as_bytes(), claims)
}

pub struct TestApp {
    pub state: AppState,
    pub transformer: Arc<ScriptedTransformer>,
    _temp: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let transformer = Arc::new(ScriptedTransformer::default());
        let state = AppState::open(
            StoragePaths::new(temp.path()),
            transformer.clone(),
            Duration::seconds(DEFAULT_ORPHAN_GRACE_SECS),
        )
        .unwrap()
        .with_auth_config(AuthConfig {
            jwt_secret: Some(TEST_JWT_SECRET.to_string()),
            ..AuthConfig::default()
        });

        Self {
            state,
            transformer,
            _temp: temp,
        }
    }

    pub fn router(&self) -> Router {
        super::router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Send a JSON request and parse the JSON response (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Fetch raw ciphertext for `path`.
    pub async fn fetch_blob(&self, path: &str, token: &str) -> (StatusCode, Vec<u8>) {
        let uri = format!("/v1/blobs?path={}", encode_query(path));
        let request = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
        (status, bytes.to_vec())
    }
}

fn encode_query(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}
