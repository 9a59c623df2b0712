// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Purchases and the buyer library.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreatePurchaseRequest, LibraryItem, LibraryResponse, PurchaseResponse},
    state::AppState,
};

/// Record a license to a listing.
#[utoipa::path(
    post,
    path = "/v1/purchases",
    tag = "Purchases",
    security(("bearer_auth" = [])),
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase recorded", body = PurchaseResponse),
        (status = 400, description = "Unknown listing or own listing"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Listing already purchased")
    )
)]
pub async fn create_purchase(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let purchase = state
        .gateway
        .record_purchase(&user.user_id, request.listing_id)?;
    Ok((StatusCode::CREATED, Json(PurchaseResponse::from(&purchase))))
}

/// List the caller's purchases with their listings and versions.
#[utoipa::path(
    get,
    path = "/v1/purchases",
    tag = "Purchases",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's library", body = LibraryResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_library(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<LibraryResponse>, ApiError> {
    let entries = state.gateway.library(&user.user_id)?;
    Ok(Json(LibraryResponse {
        purchases: entries.iter().map(LibraryItem::from).collect(),
    }))
}
