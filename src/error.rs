// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::custody::CustodyError;

pub const ACCESS_DENIED_MESSAGE: &str = "Purchase not found or access denied.";
pub const RETRIEVAL_FAILED_MESSAGE: &str = "Failed to retrieve code.";
pub const MODIFICATION_FAILED_MESSAGE: &str = "Modification failed.";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Collapse the gateway taxonomy into coarse client messages.
///
/// The detailed error is logged here and never sent to the client.
impl From<CustodyError> for ApiError {
    fn from(e: CustodyError) -> Self {
        match e {
            CustodyError::InvalidRequest(msg) => ApiError::bad_request(msg),
            CustodyError::AccessDenied => ApiError::not_found(ACCESS_DENIED_MESSAGE),
            CustodyError::AlreadyPurchased => ApiError::conflict("Listing already purchased."),
            CustodyError::VersionConflict {
                purchase_id,
                version_number,
            } => {
                warn!(%purchase_id, version_number, "Concurrent modification lost the race");
                ApiError::conflict("A concurrent modification created this version; retry.")
            }
            CustodyError::TransformFailed(detail) => {
                warn!(error = %detail, "Modification failed");
                ApiError::new(StatusCode::BAD_GATEWAY, MODIFICATION_FAILED_MESSAGE)
            }
            e @ (CustodyError::Storage(_) | CustodyError::Persistence(_)) => {
                error!(error = %e, "Custody infrastructure failure");
                ApiError::unavailable("Storage temporarily unavailable.")
            }
            e @ (CustodyError::Crypto(_)
            | CustodyError::CorruptRecord(_)
            | CustodyError::SourceUnavailable(_)) => {
                error!(error = %e, "Custody retrieval failure");
                ApiError::internal(RETRIEVAL_FAILED_MESSAGE)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptoError;
    use crate::storage::{LedgerError, StorageError};
    use axum::body::to_bytes;
    use uuid::Uuid;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let conflict = ApiError::conflict("again");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn custody_errors_map_to_statuses() {
        let cases: Vec<(CustodyError, StatusCode)> = vec![
            (
                CustodyError::InvalidRequest("title is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (CustodyError::AccessDenied, StatusCode::NOT_FOUND),
            (CustodyError::AlreadyPurchased, StatusCode::CONFLICT),
            (
                CustodyError::VersionConflict {
                    purchase_id: Uuid::nil(),
                    version_number: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                CustodyError::TransformFailed("empty".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CustodyError::Storage(StorageError::NotFound("x".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CustodyError::Persistence(LedgerError::InvalidRecord("x".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CustodyError::Crypto(CryptoError::AuthenticationFailed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CustodyError::CorruptRecord("no key".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CustodyError::SourceUnavailable("gone".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from(CustodyError::CorruptRecord(
            "missing key for purchase 42 version 3".into(),
        ));
        assert_eq!(err.message, RETRIEVAL_FAILED_MESSAGE);

        let err = ApiError::from(CustodyError::AccessDenied);
        assert_eq!(err.message, ACCESS_DENIED_MESSAGE);
    }
}
