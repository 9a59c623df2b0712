// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custody Gateway
//!
//! The only code path that releases a portable key or produces a new
//! encrypted version. Every operation receives an already verified caller
//! identity and checks it against the ownership ledger before touching any
//! key or ciphertext.
//!
//! ## Lineage
//!
//! ```text
//! Original (v0) --modify--> v1 --modify--> v2 --> ...
//! ```
//!
//! Version numbers are per purchase, gap-free from 1, and each node is
//! sealed under its own key. Modifying an older node still produces
//! `max + 1`; no parent edge is recorded.
//!
//! ## Consistency
//!
//! Blob writes come first, ledger inserts second. When the insert fails the
//! fresh blob is deleted before the error is returned. Blobs left behind by
//! a crash between the two steps are removed by [`CustodyGateway::reconcile_orphans`].
//! A modify that finds such a blob on its next version path, with no row
//! behind it and older than the orphan grace, deletes it and writes again.

mod blob_paths;
mod download;
mod error;
mod modify;
mod ownership;
mod purchase;
mod reconcile;
mod release;
mod upload;

use std::sync::Arc;

use chrono::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit_log;
use crate::storage::{
    AssetStore, AuditEvent, AuditEventType, AuditRepository, ListingRecord, OwnershipLedger,
    PurchaseRecord, StorageError, VersionRecord,
};
use crate::transform::CodeTransformer;

pub use blob_paths::{
    file_name_of, original_blob_path, plaintext_extension, sanitize_file_name,
    validate_segment, version_blob_path, VersionPath,
};
pub use download::{ResolveRequest, ResolvedDownload};
pub use error::{CustodyError, CustodyResult};
pub use modify::ModifyRequest;
pub use ownership::{OwnedResource, OwnershipCheck};
pub use purchase::LibraryEntry;
pub use reconcile::ReconcileReport;
pub use release::ReleasedKey;
pub use upload::UploadRequest;

/// Minimum blob age before the orphan sweep may delete it.
pub const DEFAULT_ORPHAN_GRACE_SECS: i64 = 900;

/// Dependency-injected custody gateway.
pub struct CustodyGateway {
    store: Arc<dyn AssetStore>,
    ledger: Arc<dyn OwnershipLedger>,
    transformer: Arc<dyn CodeTransformer>,
    audit: Arc<AuditRepository>,
    orphan_grace: Duration,
}

impl CustodyGateway {
    pub fn new(
        store: Arc<dyn AssetStore>,
        ledger: Arc<dyn OwnershipLedger>,
        transformer: Arc<dyn CodeTransformer>,
        audit: Arc<AuditRepository>,
    ) -> Self {
        Self {
            store,
            ledger,
            transformer,
            audit,
            orphan_grace: Duration::seconds(DEFAULT_ORPHAN_GRACE_SECS),
        }
    }

    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    pub fn store(&self) -> &dyn AssetStore {
        self.store.as_ref()
    }

    pub fn ledger(&self) -> &dyn OwnershipLedger {
        self.ledger.as_ref()
    }

    pub fn audit(&self) -> &AuditRepository {
        &self.audit
    }

    /// Log and audit an ownership denial.
    fn note_denial(&self, caller: &str, resource_type: &str, resource_id: &str, reason: &str) {
        warn!(
            user_id = %caller,
            resource_type,
            resource_id,
            reason,
            "Custody access denied"
        );
        self.audit.record(
            &AuditEvent::new(AuditEventType::AccessDenied)
                .with_user(caller)
                .with_resource(resource_type, resource_id)
                .failed(reason),
        );
    }

    /// Best-effort removal of a blob whose ledger row was never written.
    fn compensate(&self, caller: &str, path: &str) {
        match self.store.delete(path) {
            Ok(()) | Err(StorageError::NotFound(_)) => {
                info!(user_id = %caller, path, "Compensating delete removed unreferenced blob");
                audit_log!(
                    self.audit,
                    AuditEventType::CompensatingDelete,
                    caller,
                    "blob",
                    path
                );
            }
            Err(e) => {
                error!(
                    user_id = %caller,
                    path,
                    error = %e,
                    "Compensating delete failed; blob left for orphan sweep"
                );
            }
        }
    }

    /// Resolve a caller-selected blob path to a node of the caller's lineage.
    ///
    /// The path is accepted only if it is the listing's original path, or a
    /// version path under the caller's own buyer and listing segments whose
    /// row exists for the caller's purchase with the identical path.
    fn lineage_for_path(
        &self,
        caller: &str,
        listing_id: Option<Uuid>,
        path: &str,
    ) -> CustodyResult<LineageNode> {
        let version_path = VersionPath::parse(path);

        let listing = match listing_id {
            Some(id) => self.ledger.get_listing(id)?,
            None => match &version_path {
                Some(vp) => match Uuid::parse_str(&vp.listing_id) {
                    Ok(id) => self.ledger.get_listing(id)?,
                    Err(_) => None,
                },
                None => self.ledger.find_listing_by_path(path)?,
            },
        };
        let Some(listing) = listing else {
            self.note_denial(caller, "blob", path, "no listing for path");
            return Err(CustodyError::AccessDenied);
        };

        let purchase = self
            .ledger
            .find_purchase(caller, listing.id)?
            .verify_owner(caller)
            .inspect_err(|_| {
                self.note_denial(caller, "listing", &listing.id.to_string(), "no purchase")
            })?;

        if path == listing.storage_path {
            return Ok(LineageNode {
                listing,
                purchase,
                version: None,
            });
        }

        let version = match version_path {
            Some(vp) if vp.buyer_id == caller && vp.listing_id == listing.id.to_string() => self
                .ledger
                .get_version(purchase.id, vp.version_number)?
                .filter(|v| v.storage_path == path),
            _ => None,
        };

        match version {
            Some(version) => Ok(LineageNode {
                listing,
                purchase,
                version: Some(version),
            }),
            None => {
                self.note_denial(caller, "blob", path, "path outside purchase lineage");
                Err(CustodyError::AccessDenied)
            }
        }
    }
}

/// One blob of a purchase lineage with the rows that own it.
#[derive(Debug, Clone)]
struct LineageNode {
    listing: ListingRecord,
    purchase: PurchaseRecord,
    version: Option<VersionRecord>,
}

impl LineageNode {
    fn version_number(&self) -> u32 {
        self.version.as_ref().map_or(0, |v| v.version_number)
    }

    fn storage_path(&self) -> &str {
        match &self.version {
            Some(v) => &v.storage_path,
            None => &self.listing.storage_path,
        }
    }

    /// Portable key sealing this node, `CorruptRecord` when the column is empty.
    fn encryption_key(&self) -> CustodyResult<&str> {
        let key = match &self.version {
            Some(v) => v.encryption_key.as_deref(),
            None => self.listing.encryption_key.as_deref(),
        };
        key.filter(|k| !k.is_empty()).ok_or_else(|| {
            error!(
                purchase_id = %self.purchase.id,
                version_number = self.version_number(),
                "Encryption key missing from ledger row"
            );
            CustodyError::CorruptRecord(format!(
                "missing key for purchase {} version {}",
                self.purchase.id,
                self.version_number()
            ))
        })
    }
}

#[cfg(test)]
pub(crate) mod testing;
