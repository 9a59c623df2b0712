// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Code transformation collaborator.
//!
//! The custody gateway hands decrypted source plus a natural-language
//! instruction to a [`CodeTransformer`] and reseals whatever comes back.
//! Output is untrusted and gets no special treatment beyond being non-empty.

pub mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiTransformer;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("code transformer is not configured")]
    NotConfigured,

    #[error("transformer request failed: {0}")]
    Request(String),

    #[error("transformer returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transformer response was invalid: {0}")]
    InvalidResponse(String),

    #[error("transformer returned no code")]
    EmptyOutput,
}

/// Produces modified source code from source plus an instruction.
#[async_trait]
pub trait CodeTransformer: Send + Sync {
    async fn transform(&self, source: &str, instruction: &str) -> Result<String, TransformError>;
}

/// Stand-in used when no transformation backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredTransformer;

#[async_trait]
impl CodeTransformer for UnconfiguredTransformer {
    async fn transform(&self, _source: &str, _instruction: &str) -> Result<String, TransformError> {
        Err(TransformError::NotConfigured)
    }
}

/// Trim model output and drop a surrounding Markdown code fence, including
/// its info string line.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let body = &trimmed[3..trimmed.len() - 3];
        // Drop the info string line (```python).
        let body = match body.find('\n') {
            Some(idx) => &body[idx + 1..],
            None => "",
        };
        return body.trim().to_string();
    }
    trimmed.to_string()
}
