// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tracing::info;
use uuid::Uuid;

use crate::audit_log;
use crate::storage::{AuditEventType, StorageError};

use super::{
    file_name_of, CustodyError, CustodyGateway, CustodyResult, LineageNode, OwnershipCheck,
};

/// What to download. With `storage_path` set the path itself is the
/// target; otherwise `listing_id` is required and `version_number` picks
/// the node (absent = latest, 0 = original).
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub listing_id: Option<Uuid>,
    pub storage_path: Option<String>,
    pub version_number: Option<u32>,
}

/// Where a purchaser's ciphertext lives. Never carries a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
    pub storage_path: String,
    pub purchase_id: Uuid,
    pub version_number: u32,
    pub file_name: String,
}

impl From<&LineageNode> for ResolvedDownload {
    fn from(node: &LineageNode) -> Self {
        Self {
            storage_path: node.storage_path().to_string(),
            purchase_id: node.purchase.id,
            version_number: node.version_number(),
            file_name: file_name_of(node.storage_path()),
        }
    }
}

impl CustodyGateway {
    /// Resolve the blob a purchaser should download.
    pub fn resolve_download(
        &self,
        caller: &str,
        request: ResolveRequest,
    ) -> CustodyResult<ResolvedDownload> {
        let node = match request.storage_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                self.lineage_for_path(caller, request.listing_id, path)?
            }
            _ => {
                let listing_id = request.listing_id.ok_or_else(|| {
                    CustodyError::InvalidRequest(
                        "listing_id or storage_path is required".to_string(),
                    )
                })?;
                self.lineage_for_version(caller, listing_id, request.version_number)?
            }
        };

        let resolved = ResolvedDownload::from(&node);
        info!(
            user_id = %caller,
            purchase_id = %resolved.purchase_id,
            version_number = resolved.version_number,
            "Download target resolved"
        );
        audit_log!(
            self.audit,
            AuditEventType::DownloadResolved,
            caller,
            "blob",
            resolved.storage_path.clone()
        );
        Ok(resolved)
    }

    /// Return raw ciphertext for a path in the caller's lineage.
    pub fn fetch_ciphertext(&self, caller: &str, storage_path: &str) -> CustodyResult<Vec<u8>> {
        let node = self.lineage_for_path(caller, None, storage_path)?;
        let bytes = self.store.get(node.storage_path()).map_err(|e| match e {
            StorageError::NotFound(path) => {
                CustodyError::SourceUnavailable(format!("blob missing at {path}"))
            }
            other => CustodyError::Storage(other),
        })?;

        audit_log!(
            self.audit,
            AuditEventType::CiphertextFetched,
            caller,
            "blob",
            storage_path
        );
        Ok(bytes)
    }

    fn lineage_for_version(
        &self,
        caller: &str,
        listing_id: Uuid,
        version_number: Option<u32>,
    ) -> CustodyResult<LineageNode> {
        let deny = |reason: &str| {
            self.note_denial(caller, "listing", &listing_id.to_string(), reason);
            CustodyError::AccessDenied
        };

        let Some(listing) = self.ledger.get_listing(listing_id)? else {
            return Err(deny("no such listing"));
        };
        let purchase = self
            .ledger
            .find_purchase(caller, listing_id)?
            .verify_owner(caller)
            .map_err(|_| deny("no purchase"))?;

        let version = match version_number {
            Some(0) => None,
            Some(n) => Some(
                self.ledger
                    .get_version(purchase.id, n)?
                    .ok_or_else(|| deny("no such version"))?,
            ),
            None => self.ledger.latest_version(purchase.id)?,
        };

        Ok(LineageNode {
            listing,
            purchase,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::testing::{upload_request, Harness};
    use crate::custody::ModifyRequest;

    fn modify(listing_id: Uuid, path: &str) -> ModifyRequest {
        ModifyRequest {
            listing_id,
            storage_path: path.to_string(),
            instruction: "add a comment".to_string(),
        }
    }

    #[tokio::test]
    async fn resolves_latest_then_explicit_versions() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("main.py", "x = 1")).unwrap();
        let purchase = h.gateway.record_purchase("buyer", listing.id).unwrap();

        let by_listing = ResolveRequest {
            listing_id: Some(listing.id),
            ..Default::default()
        };
        let original = h.gateway.resolve_download("buyer", by_listing.clone()).unwrap();
        assert_eq!(original.storage_path, listing.storage_path);
        assert_eq!(original.version_number, 0);
        assert_eq!(original.purchase_id, purchase.id);
        assert!(original.file_name.ends_with("_main.py.enc"));

        let v1 = h
            .gateway
            .modify("buyer", modify(listing.id, &listing.storage_path))
            .await
            .unwrap();

        let latest = h.gateway.resolve_download("buyer", by_listing).unwrap();
        assert_eq!(latest.version_number, 1);
        assert_eq!(latest.storage_path, v1.storage_path);
        assert_eq!(latest.file_name, "v1.py.enc");

        let pinned = h
            .gateway
            .resolve_download(
                "buyer",
                ResolveRequest {
                    listing_id: Some(listing.id),
                    version_number: Some(0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(pinned.storage_path, listing.storage_path);
    }

    #[tokio::test]
    async fn resolves_by_path_alone() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("main.py", "x = 1")).unwrap();
        h.gateway.record_purchase("buyer", listing.id).unwrap();
        let v1 = h
            .gateway
            .modify("buyer", modify(listing.id, &listing.storage_path))
            .await
            .unwrap();

        for (path, n) in [(listing.storage_path.as_str(), 0), (v1.storage_path.as_str(), 1)] {
            let resolved = h
                .gateway
                .resolve_download(
                    "buyer",
                    ResolveRequest {
                        storage_path: Some(path.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(resolved.storage_path, path);
            assert_eq!(resolved.version_number, n);
        }
    }

    #[tokio::test]
    async fn foreign_paths_are_denied() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("main.py", "x = 1")).unwrap();
        let other = h.gateway.upload("seller", upload_request("other.py", "y")).unwrap();
        h.gateway.record_purchase("alice", listing.id).unwrap();
        h.gateway.record_purchase("bob", listing.id).unwrap();
        let alice_v1 = h
            .gateway
            .modify("alice", modify(listing.id, &listing.storage_path))
            .await
            .unwrap();

        let by_path = |path: &str, listing_id: Option<Uuid>| ResolveRequest {
            listing_id,
            storage_path: Some(path.to_string()),
            version_number: None,
        };

        // Alice's version path, requested by Bob.
        assert!(matches!(
            h.gateway.resolve_download("bob", by_path(&alice_v1.storage_path, None)),
            Err(CustodyError::AccessDenied)
        ));
        // Bob rewrites the buyer segment to his own: no such row.
        let forged = alice_v1.storage_path.replacen("alice", "bob", 1);
        assert!(matches!(
            h.gateway.resolve_download("bob", by_path(&forged, Some(listing.id))),
            Err(CustodyError::AccessDenied)
        ));
        // A listing Bob never bought, addressed through one he did.
        assert!(matches!(
            h.gateway.resolve_download("bob", by_path(&other.storage_path, Some(listing.id))),
            Err(CustodyError::AccessDenied)
        ));
        assert!(matches!(
            h.gateway.fetch_ciphertext("bob", &other.storage_path),
            Err(CustodyError::AccessDenied)
        ));
        // No purchase at all.
        assert!(matches!(
            h.gateway.resolve_download(
                "mallory",
                ResolveRequest {
                    listing_id: Some(listing.id),
                    ..Default::default()
                }
            ),
            Err(CustodyError::AccessDenied)
        ));
    }

    #[test]
    fn missing_selector_is_invalid() {
        let h = Harness::new();
        assert!(matches!(
            h.gateway.resolve_download("buyer", ResolveRequest::default()),
            Err(CustodyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn fetch_returns_ciphertext_only_to_purchaser() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("main.py", "x = 1")).unwrap();
        h.gateway.record_purchase("buyer", listing.id).unwrap();

        let bytes = h.gateway.fetch_ciphertext("buyer", &listing.storage_path).unwrap();
        assert_eq!(bytes, h.store.get_blob(&listing.storage_path));
        assert_ne!(bytes, b"x = 1");

        assert!(matches!(
            h.gateway.fetch_ciphertext("stranger", &listing.storage_path),
            Err(CustodyError::AccessDenied)
        ));
    }
}
