// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operational endpoints: orphan sweep and audit log queries.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    auth::{AdminOnly, AuditReader},
    custody::ReconcileReport,
    error::ApiError,
    models::{AuditLogResponse, AuditQuery},
    state::AppState,
    storage::StorageError,
};

/// Delete blobs no listing or version references.
///
/// Blobs younger than `ORPHAN_GRACE_SECS` are kept. Admin only.
#[utoipa::path(
    post,
    path = "/v1/admin/reconcile",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep report", body = ReconcileReport),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn reconcile_orphans(
    AdminOnly(user): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<ReconcileReport>, ApiError> {
    let report = state.gateway.reconcile_orphans(&user.user_id)?;
    Ok(Json(report))
}

/// Read one day of audit events. Admin or auditor.
#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin or auditor required)")
    )
)]
pub async fn read_audit_log(
    AuditReader(_user): AuditReader,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let events = state
        .gateway
        .audit()
        .read_events(&query.date)
        .map_err(|e| match e {
            StorageError::InvalidPath(msg) => ApiError::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Failed to read audit log");
                ApiError::unavailable("Audit log unavailable.")
            }
        })?;

    Ok(Json(AuditLogResponse {
        total: events.len(),
        date: query.date,
        events,
    }))
}
