// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::storage::{AuditEvent, AuditEventType, StorageError};

use super::{CustodyGateway, CustodyResult};

/// Outcome of one orphan sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Blobs found in the asset store.
    pub scanned: usize,
    /// Distinct paths referenced by listing or version rows.
    pub referenced: usize,
    /// Unreferenced blobs removed by this sweep.
    pub deleted: Vec<String>,
    /// Unreferenced blobs kept because they are younger than the grace period.
    pub retained_recent: usize,
    /// Unreferenced blobs whose delete failed.
    pub failed: usize,
}

impl CustodyGateway {
    /// Delete blobs that no ledger row references.
    ///
    /// Blobs younger than the grace period are kept: they may belong to an
    /// upload or modification whose ledger insert has not committed yet.
    pub fn reconcile_orphans(&self, actor: &str) -> CustodyResult<ReconcileReport> {
        let blobs = self.store.list()?;
        let referenced = self.ledger.referenced_paths()?;
        let cutoff = Utc::now() - self.orphan_grace;

        let mut report = ReconcileReport {
            scanned: blobs.len(),
            referenced: referenced.len(),
            ..Default::default()
        };

        for blob in blobs {
            if referenced.contains(&blob.path) {
                continue;
            }
            if blob.modified_at > cutoff {
                report.retained_recent += 1;
                continue;
            }

            match self.store.delete(&blob.path) {
                Ok(()) | Err(StorageError::NotFound(_)) => {
                    info!(actor, path = %blob.path, "Orphaned blob swept");
                    self.audit.record(
                        &AuditEvent::new(AuditEventType::OrphanSwept)
                            .with_user(actor)
                            .with_resource("blob", blob.path.as_str())
                            .with_details(serde_json::json!({
                                "modified_at": blob.modified_at,
                            })),
                    );
                    report.deleted.push(blob.path);
                }
                Err(e) => {
                    warn!(actor, path = %blob.path, error = %e, "Failed to sweep orphaned blob");
                    report.failed += 1;
                }
            }
        }

        info!(
            actor,
            scanned = report.scanned,
            deleted = report.deleted.len(),
            retained_recent = report.retained_recent,
            failed = report.failed,
            "Orphan sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::custody::testing::{upload_request, Harness};
    use crate::custody::ModifyRequest;

    #[tokio::test]
    async fn sweeps_only_unreferenced_blobs() {
        let h = Harness::with_orphan_grace(Duration::zero());
        let listing = h.gateway.upload("seller", upload_request("a.py", "x")).unwrap();
        h.gateway.record_purchase("buyer", listing.id).unwrap();
        let v1 = h
            .gateway
            .modify(
                "buyer",
                ModifyRequest {
                    listing_id: listing.id,
                    storage_path: listing.storage_path.clone(),
                    instruction: "x".to_string(),
                },
            )
            .await
            .unwrap();
        h.store.plant("seller/1_lost.py.enc", b"orphan");

        let report = h.gateway.reconcile_orphans("admin").unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.referenced, 2);
        assert_eq!(report.deleted, vec!["seller/1_lost.py.enc".to_string()]);
        assert_eq!(report.failed, 0);

        let mut remaining = h.store.all_paths();
        remaining.sort();
        let mut expected = vec![listing.storage_path, v1.storage_path];
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn recent_orphans_are_retained() {
        let h = Harness::new();
        h.store.plant("seller/1_fresh.py.enc", b"in flight");

        let report = h.gateway.reconcile_orphans("admin").unwrap();
        assert_eq!(report.scanned, 1);
        assert!(report.deleted.is_empty());
        assert_eq!(report.retained_recent, 1);
        assert!(h.store.exists("seller/1_fresh.py.enc"));
    }

    #[test]
    fn sweep_is_audited() {
        let h = Harness::with_orphan_grace(Duration::zero());
        h.store.plant("seller/1_lost.py.enc", b"orphan");
        h.gateway.reconcile_orphans("admin").unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = h.gateway.audit().read_events(&today).unwrap();
        assert!(events.iter().any(|e| e.event_type == AuditEventType::OrphanSwept
            && e.resource_id.as_deref() == Some("seller/1_lost.py.enc")));
    }
}
