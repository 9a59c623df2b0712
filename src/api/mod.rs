// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, Role},
    custody::ReconcileReport,
    models::{
        AuditLogResponse, CreateListingRequest, CreateModificationRequest, CreatePurchaseRequest,
        LibraryItem, LibraryResponse, ListingResponse, ModificationResponse, NewVersion,
        PurchaseResponse, ReleaseKeyRequest, ReleaseKeyResponse, ResolveDownloadRequest,
        ResolveDownloadResponse, VersionSummary,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

pub mod admin;
pub mod downloads;
pub mod health;
pub mod keys;
pub mod listings;
pub mod modifications;
pub mod purchases;

#[cfg(test)]
pub(crate) mod testing;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/listings", post(listings::create_listing))
        .route(
            "/purchases",
            get(purchases::list_library).post(purchases::create_purchase),
        )
        .route("/keys/release", post(keys::release_key))
        .route("/downloads/resolve", post(downloads::resolve_download))
        .route("/blobs", get(downloads::fetch_blob))
        .route("/modifications", post(modifications::create_modification))
        .route("/admin/reconcile", post(admin::reconcile_orphans))
        .route("/admin/audit", get(admin::read_audit_log));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        listings::create_listing,
        purchases::create_purchase,
        purchases::list_library,
        keys::release_key,
        downloads::resolve_download,
        downloads::fetch_blob,
        modifications::create_modification,
        admin::reconcile_orphans,
        admin::read_audit_log
    ),
    components(
        schemas(
            AuthenticatedUser,
            Role,
            CreateListingRequest,
            ListingResponse,
            CreatePurchaseRequest,
            PurchaseResponse,
            LibraryItem,
            LibraryResponse,
            VersionSummary,
            ReleaseKeyRequest,
            ReleaseKeyResponse,
            ResolveDownloadRequest,
            ResolveDownloadResponse,
            CreateModificationRequest,
            ModificationResponse,
            NewVersion,
            ReconcileReport,
            AuditLogResponse,
            AuditEvent,
            AuditEventType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Listings", description = "Seller uploads"),
        (name = "Purchases", description = "Licenses and buyer library"),
        (name = "Keys", description = "Ownership-gated key release"),
        (name = "Downloads", description = "Download resolution and ciphertext fetch"),
        (name = "Modifications", description = "Versioned re-encryption"),
        (name = "Admin", description = "Orphan sweep and audit log")
    )
)]
struct ApiDoc;
