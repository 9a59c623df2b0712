// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::audit_log;
use crate::crypto::{seal, ContentKey};
use crate::storage::{AuditEventType, ListingRecord, StorageError};

use super::{
    original_blob_path, sanitize_file_name, CustodyError, CustodyGateway, CustodyResult,
};

/// Consecutive path tokens tried before an upload gives up on a collision.
const MAX_PATH_ATTEMPTS: i64 = 3;

/// A seller's upload: plaintext plus listing metadata.
#[derive(Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub requirements: Vec<String>,
    pub file_name: String,
    pub plaintext: Vec<u8>,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("title", &self.title)
            .field("file_name", &self.file_name)
            .field("plaintext_len", &self.plaintext.len())
            .finish_non_exhaustive()
    }
}

impl CustodyGateway {
    /// Seal a seller's code under a fresh key and create its listing.
    ///
    /// The returned record carries the key; callers must not echo it back.
    pub fn upload(
        &self,
        seller_id: &str,
        request: UploadRequest,
    ) -> CustodyResult<ListingRecord> {
        let title = request.title.trim();
        let description = request.description.trim();
        if title.is_empty() {
            return Err(CustodyError::InvalidRequest("title is required".to_string()));
        }
        if description.is_empty() {
            return Err(CustodyError::InvalidRequest(
                "description is required".to_string(),
            ));
        }

        let file_name = sanitize_file_name(&request.file_name)?;
        let created_at = Utc::now();

        let key = ContentKey::generate()?;
        let blob = seal(&request.plaintext, &key)?;
        let storage_path =
            self.put_original(seller_id, created_at.timestamp_millis(), &file_name, &blob)?;

        let listing = ListingRecord {
            id: Uuid::new_v4(),
            seller_id: seller_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price_cents: request.price_cents,
            file_name,
            storage_path,
            encryption_key: Some(key.export_portable()),
            requirements: request
                .requirements
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            created_at,
        };

        if let Err(e) = self.ledger.insert_listing(&listing) {
            error!(
                seller_id = %seller_id,
                path = %listing.storage_path,
                error = %e,
                "Listing insert failed after blob upload"
            );
            self.compensate(seller_id, &listing.storage_path);
            return Err(CustodyError::Persistence(e));
        }

        info!(
            seller_id = %seller_id,
            listing_id = %listing.id,
            path = %listing.storage_path,
            "Asset sealed"
        );
        audit_log!(
            self.audit,
            AuditEventType::AssetSealed,
            seller_id,
            "listing",
            listing.id.to_string()
        );

        Ok(listing)
    }

    /// Write an original blob, moving to the next token when the same seller
    /// already uploaded this file name within the same millisecond.
    fn put_original(
        &self,
        seller_id: &str,
        token_millis: i64,
        file_name: &str,
        blob: &[u8],
    ) -> CustodyResult<String> {
        let mut last_taken = String::new();
        for token in token_millis..token_millis.saturating_add(MAX_PATH_ATTEMPTS) {
            let path = original_blob_path(seller_id, token, file_name)?;
            match self.store.put(&path, blob) {
                Ok(()) => return Ok(path),
                Err(StorageError::AlreadyExists(_)) => {
                    debug!(seller_id = %seller_id, path = %path, "Original path taken");
                    last_taken = path;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CustodyError::Storage(StorageError::AlreadyExists(last_taken)))
    }
}
