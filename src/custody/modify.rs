// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::crypto::{open, seal, ContentKey};
use crate::storage::{AuditEvent, AuditEventType, StorageError, VersionRecord};

use super::{
    plaintext_extension, validate_segment, version_blob_path, CustodyError, CustodyGateway,
    CustodyResult,
};

/// Unseal → transform → reseal request for one node of a lineage.
#[derive(Debug, Clone)]
pub struct ModifyRequest {
    pub listing_id: Uuid,
    /// Original or version path to use as the base.
    pub storage_path: String,
    /// Natural-language instruction passed to the transformer.
    pub instruction: String,
}

impl CustodyGateway {
    /// Produce the next version of the caller's lineage.
    ///
    /// The new number is `max + 1` for the purchase regardless of which node
    /// served as the base. A concurrent call that loses the race for the
    /// same number fails with [`CustodyError::VersionConflict`].
    pub async fn modify(
        &self,
        caller: &str,
        request: ModifyRequest,
    ) -> CustodyResult<VersionRecord> {
        let instruction = request.instruction.trim();
        let source_path = request.storage_path.trim();
        if instruction.is_empty() {
            return Err(CustodyError::InvalidRequest(
                "modification request text is required".to_string(),
            ));
        }
        if source_path.is_empty() {
            return Err(CustodyError::InvalidRequest(
                "storage_path is required".to_string(),
            ));
        }
        validate_segment(caller, "buyer id")?;

        let node = self.lineage_for_path(caller, Some(request.listing_id), source_path)?;
        let purchase_id = node.purchase.id;

        // Unseal the base node.
        let source_key = ContentKey::import_portable(node.encryption_key()?)?;
        let blob = self.store.get(node.storage_path()).map_err(|e| {
            error!(
                purchase_id = %purchase_id,
                path = %node.storage_path(),
                error = %e,
                "Source blob unavailable"
            );
            CustodyError::SourceUnavailable(e.to_string())
        })?;
        let plaintext = open(&blob, &source_key)?;
        let source = String::from_utf8(plaintext)
            .map_err(|_| CustodyError::TransformFailed("source is not UTF-8 text".to_string()))?;

        let modified = self
            .transformer
            .transform(&source, instruction)
            .await
            .inspect_err(|e| {
                warn!(purchase_id = %purchase_id, error = %e, "Transformation failed");
            })?;
        let modified = modified.trim();
        if modified.is_empty() {
            return Err(CustodyError::TransformFailed(
                "transformer returned empty code".to_string(),
            ));
        }

        let version_number = match self.ledger.latest_version(purchase_id)? {
            Some(latest) => latest.version_number.checked_add(1).ok_or_else(|| {
                CustodyError::CorruptRecord(format!("version counter exhausted for {purchase_id}"))
            })?,
            None => 1,
        };

        // Reseal under a brand-new key.
        let key = ContentKey::generate()?;
        let sealed = seal(modified.as_bytes(), &key)?;
        let storage_path = version_blob_path(
            caller,
            node.listing.id,
            version_number,
            &plaintext_extension(node.storage_path()),
        );

        self.put_version_blob(caller, purchase_id, version_number, &storage_path, &sealed)?;

        let version = VersionRecord {
            id: Uuid::new_v4(),
            purchase_id,
            version_number,
            storage_path,
            encryption_key: Some(key.export_portable()),
            modification_request: instruction.to_string(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.ledger.insert_version(&version) {
            error!(
                purchase_id = %purchase_id,
                version_number,
                error = %e,
                "Version insert failed after blob upload"
            );
            self.compensate(caller, &version.storage_path);
            return Err(e.into());
        }

        info!(
            user_id = %caller,
            purchase_id = %purchase_id,
            base_version = node.version_number(),
            version_number,
            "Version created"
        );
        self.audit.record(
            &AuditEvent::new(AuditEventType::VersionCreated)
                .with_user(caller)
                .with_resource("purchase", purchase_id.to_string())
                .with_details(serde_json::json!({
                    "version_number": version_number,
                    "base_version": node.version_number(),
                    "storage_path": version.storage_path,
                })),
        );

        Ok(version)
    }

    /// Write a version blob, reclaiming the path once if an unreferenced
    /// blob older than the orphan grace is squatting on it.
    fn put_version_blob(
        &self,
        caller: &str,
        purchase_id: Uuid,
        version_number: u32,
        path: &str,
        sealed: &[u8],
    ) -> CustodyResult<()> {
        match self.store.put(path, sealed) {
            Ok(()) => return Ok(()),
            Err(StorageError::AlreadyExists(_)) => {}
            Err(e) => return Err(CustodyError::Storage(e)),
        }
        if self.reclaim_stale_version_path(caller, purchase_id, version_number, path)? {
            match self.store.put(path, sealed) {
                Ok(()) => return Ok(()),
                Err(StorageError::AlreadyExists(_)) => {}
                Err(e) => return Err(CustodyError::Storage(e)),
            }
        }

        // The path belongs to whichever call claimed this number first.
        warn!(purchase_id = %purchase_id, version_number, "Version path already claimed");
        Err(CustodyError::VersionConflict {
            purchase_id,
            version_number,
        })
    }

    /// Delete a blob at a version path when no ledger row owns it and it is
    /// older than the orphan grace. Returns whether the path is free again.
    fn reclaim_stale_version_path(
        &self,
        caller: &str,
        purchase_id: Uuid,
        version_number: u32,
        path: &str,
    ) -> CustodyResult<bool> {
        if self.ledger.get_version(purchase_id, version_number)?.is_some() {
            return Ok(false);
        }

        let modified_at = match self.store.modified_at(path) {
            Ok(modified_at) => modified_at,
            Err(StorageError::NotFound(_)) => return Ok(true),
            Err(e) => return Err(CustodyError::Storage(e)),
        };
        // Younger blobs may still be mid-flight in a concurrent modify.
        if modified_at > Utc::now() - self.orphan_grace {
            return Ok(false);
        }

        match self.store.delete(path) {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(CustodyError::Storage(e)),
        }
        info!(
            user_id = %caller,
            purchase_id = %purchase_id,
            version_number,
            path,
            "Reclaimed stale orphan at version path"
        );
        self.audit.record(
            &AuditEvent::new(AuditEventType::OrphanSwept)
                .with_user(caller)
                .with_resource("blob", path)
                .with_details(serde_json::json!({ "version_number": version_number })),
        );
        Ok(true)
    }
}
