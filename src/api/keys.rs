// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::header, response::IntoResponse, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{ReleaseKeyRequest, ReleaseKeyResponse},
    state::AppState,
};

/// Release the portable key for one node of the caller's purchase lineage.
///
/// Version 0 (or an absent version) is the original upload.
#[utoipa::path(
    post,
    path = "/v1/keys/release",
    tag = "Keys",
    security(("bearer_auth" = [])),
    request_body = ReleaseKeyRequest,
    responses(
        (status = 200, description = "Key released", body = ReleaseKeyResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Purchase not found or access denied"),
        (status = 500, description = "Failed to retrieve code")
    )
)]
pub async fn release_key(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ReleaseKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let released = state.gateway.release_key(
        &user.user_id,
        request.purchase_id,
        request.version_number.unwrap_or(0),
    )?;
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(ReleaseKeyResponse::from(released)),
    ))
}
