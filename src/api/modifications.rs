// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    custody::ModifyRequest,
    error::ApiError,
    models::{CreateModificationRequest, ModificationResponse, NewVersion},
    state::AppState,
};

/// Create the next version of a purchased asset.
///
/// The chosen base is decrypted, transformed according to `request_text`,
/// and sealed under a new key as version `max + 1` of the purchase.
#[utoipa::path(
    post,
    path = "/v1/modifications",
    tag = "Modifications",
    security(("bearer_auth" = [])),
    request_body = CreateModificationRequest,
    responses(
        (status = 201, description = "Version created", body = ModificationResponse),
        (status = 400, description = "Missing request text or storage path"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Purchase not found or access denied"),
        (status = 409, description = "Concurrent modification claimed the version number"),
        (status = 502, description = "Modification failed")
    )
)]
pub async fn create_modification(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateModificationRequest>,
) -> Result<(StatusCode, Json<ModificationResponse>), ApiError> {
    let version = state
        .gateway
        .modify(
            &user.user_id,
            ModifyRequest {
                listing_id: request.listing_id,
                storage_path: request.storage_path,
                instruction: request.request_text,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ModificationResponse {
            message: format!("Version {} created.", version.version_number),
            new_version: NewVersion {
                version_number: version.version_number,
                storage_path: version.storage_path,
            },
        }),
    ))
}
