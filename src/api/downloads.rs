// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Download resolution and ciphertext fetch.
//!
//! Clients resolve a path, fetch the ciphertext, release the key, and
//! decrypt locally. No endpoint returns plaintext.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{BlobQuery, ResolveDownloadRequest, ResolveDownloadResponse},
    state::AppState,
};

/// Resolve which blob of the caller's lineage to download.
#[utoipa::path(
    post,
    path = "/v1/downloads/resolve",
    tag = "Downloads",
    security(("bearer_auth" = [])),
    request_body = ResolveDownloadRequest,
    responses(
        (status = 200, description = "Download target", body = ResolveDownloadResponse),
        (status = 400, description = "Neither listing_id nor storage_path given"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Purchase not found or access denied")
    )
)]
pub async fn resolve_download(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ResolveDownloadRequest>,
) -> Result<Json<ResolveDownloadResponse>, ApiError> {
    let resolved = state
        .gateway
        .resolve_download(&user.user_id, request.into())?;
    Ok(Json(ResolveDownloadResponse::from(resolved)))
}

/// Fetch the raw ciphertext of a blob in the caller's lineage.
#[utoipa::path(
    get,
    path = "/v1/blobs",
    tag = "Downloads",
    security(("bearer_auth" = [])),
    params(BlobQuery),
    responses(
        (
            status = 200,
            description = "Sealed blob (IV || ciphertext || tag)",
            content_type = "application/octet-stream",
            body = Vec<u8>
        ),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Purchase not found or access denied"),
        (status = 500, description = "Failed to retrieve code")
    )
)]
pub async fn fetch_blob(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<BlobQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.gateway.fetch_ciphertext(&user.user_id, &query.path)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    ))
}
