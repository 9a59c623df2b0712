// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seller uploads.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateListingRequest, ListingResponse},
    state::AppState,
};

/// Seal a code asset and create its listing.
///
/// The code is encrypted under a fresh key before it is stored. The key is
/// never returned; buyers obtain it through key release after purchase.
#[utoipa::path(
    post,
    path = "/v1/listings",
    tag = "Listings",
    security(("bearer_auth" = [])),
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = ListingResponse),
        (status = 400, description = "Missing title, description or file name"),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_listing(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    let listing = state.gateway.upload(&user.user_id, request.into())?;
    Ok((StatusCode::CREATED, Json(ListingResponse::from(&listing))))
}
