// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gemini `generateContent` integration for code modification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{strip_code_fences, CodeTransformer, TransformError};

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct GeminiTransformer {
    api_base_url: String,
    model: String,
    api_key: String,
    http: Client,
}

impl GeminiTransformer {
    pub fn is_configured() -> bool {
        env_optional("GEMINI_API_KEY").is_some()
    }

    pub fn from_env() -> Result<Self, TransformError> {
        let api_key = env_optional("GEMINI_API_KEY").ok_or(TransformError::NotConfigured)?;
        let model = env_or_default("GEMINI_MODEL", DEFAULT_MODEL);
        let api_base_url = env_or_default("GEMINI_API_BASE_URL", DEFAULT_API_BASE_URL);
        Self::new(api_base_url, model, api_key)
    }

    pub fn new(
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, TransformError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransformError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url, self.model
        )
    }
}

#[async_trait]
impl CodeTransformer for GeminiTransformer {
    async fn transform(&self, source: &str, instruction: &str) -> Result<String, TransformError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": build_prompt(source, instruction) }] }],
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransformError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            warn!(status = status.as_u16(), model = %self.model, "Gemini request failed");
            return Err(TransformError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()))?;

        let code = extract_code(&result)?;
        info!(model = %self.model, output_len = code.len(), "Gemini returned modified code");
        Ok(code)
    }
}

fn build_prompt(source: &str, instruction: &str) -> String {
    format!(
        "You are an expert programmer. Modify the following code based ONLY on the user request. \
         Output ONLY the modified code, no explanations or markdown formatting.\n\n\
         Original Code:\n```\n{source}\n```\n\n\
         User Request: {instruction}\n\n\
         Modified Code:"
    )
}

/// Pull `candidates[0].content.parts[0].text` out of a response.
fn extract_code(response: &Value) -> Result<String, TransformError> {
    let text = response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let code = strip_code_fences(text);
    if code.is_empty() {
        return Err(TransformError::EmptyOutput);
    }
    Ok(code)
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}
